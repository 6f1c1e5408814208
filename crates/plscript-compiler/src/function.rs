//! Routine metadata and the compiled function.
//!
//! [`RoutineSource`] describes a stored routine as the catalog defines it;
//! [`CallContext`] adds what only the call site knows (trigger-ness, concrete
//! types for polymorphic parameters, validation mode). A successful compile
//! produces one immutable [`CompiledFunction`], which the external cache owns
//! from then on.

use bitflags::bitflags;

use plscript_core::{DatumId, Oid};

use crate::action::Block;
use crate::datum::Datum;
use crate::resolver::ResolutionPolicy;

bitflags! {
    /// Behavior flags of a compiled function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FunctionTraits: u8 {
        /// Returns a set of rows rather than a single value.
        const RETURNS_SET = 1 << 0;
        /// The return type is row-shaped.
        const RETURNS_TUPLE = 1 << 1;
        /// The return type is a domain.
        const RETURNS_DOMAIN = 1 << 2;
        /// Declared STABLE or IMMUTABLE: never writes persistent state, so
        /// the executor may use its read-only fast paths.
        const READ_ONLY = 1 << 3;
        /// An exception block appears somewhere in the body; the executor
        /// must track local assignments for rollback.
        const HAS_EXCEPTION_BLOCK = 1 << 4;
    }
}

/// Function or procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Function,
    Procedure,
}

/// Declared mode of one routine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    In,
    Out,
    InOut,
    Variadic,
    /// RETURNS TABLE column, which behaves as an OUT parameter.
    Table,
}

impl ArgMode {
    /// Whether a parameter of this mode receives a call-site value.
    pub fn is_input(self) -> bool {
        matches!(self, ArgMode::In | ArgMode::InOut | ArgMode::Variadic)
    }

    /// Whether a parameter of this mode contributes to the result.
    pub fn is_output(self) -> bool {
        matches!(self, ArgMode::Out | ArgMode::InOut | ArgMode::Table)
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    /// The declared name, when the source gave one.
    pub name: Option<String>,
    pub type_oid: Oid,
    pub mode: ArgMode,
}

impl ArgSpec {
    /// An anonymous IN parameter.
    pub fn input(type_oid: Oid) -> Self {
        Self {
            name: None,
            type_oid,
            mode: ArgMode::In,
        }
    }

    /// A named parameter with the given mode.
    pub fn named(name: &str, type_oid: Oid, mode: ArgMode) -> Self {
        Self {
            name: Some(name.to_string()),
            type_oid,
            mode,
        }
    }
}

/// Declared volatility of a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    Volatile,
    Stable,
    Immutable,
}

/// How the routine is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    NotTrigger,
    DmlTrigger,
    EventTrigger,
}

/// A stored routine as defined in the catalog.
#[derive(Debug, Clone)]
pub struct RoutineSource {
    pub oid: Oid,
    pub name: String,
    pub kind: RoutineKind,
    pub args: Vec<ArgSpec>,
    pub return_type: Oid,
    pub returns_set: bool,
    pub volatility: Volatility,
    /// Collation the routine was invoked with, applied to collatable
    /// parameter and return types.
    pub input_collation: Option<Oid>,
    /// The routine body source text.
    pub body: String,
}

/// Everything the compiler needs about one invocation context.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub routine: RoutineSource,
    pub trigger: TriggerKind,
    /// Concrete argument types at the call site, for resolving polymorphic
    /// parameters. `None` when compiling for validation.
    pub call_arg_types: Option<Vec<Oid>>,
    /// Concrete return type at the call site, for a polymorphic return.
    pub call_return_type: Option<Oid>,
    /// Compiling only to validate the definition: polymorphic types get
    /// arbitrary representatives and execution-only checks are skipped.
    pub for_validator: bool,
}

impl CallContext {
    /// A plain (non-trigger) execution context.
    pub fn plain(routine: RoutineSource) -> Self {
        Self {
            routine,
            trigger: TriggerKind::NotTrigger,
            call_arg_types: None,
            call_return_type: None,
            for_validator: false,
        }
    }

    /// A validation-only context.
    pub fn validator(routine: RoutineSource) -> Self {
        Self {
            for_validator: true,
            ..Self::plain(routine)
        }
    }

    /// A trigger invocation context.
    pub fn trigger(routine: RoutineSource, kind: TriggerKind) -> Self {
        Self {
            trigger: kind,
            ..Self::plain(routine)
        }
    }
}

/// The immutable product of one successful compile.
///
/// The datum array is the arena's final contents; ids assigned during
/// compilation index into it unchanged. The cache component owns the value
/// and decides when to drop or recompile it.
#[derive(Debug)]
pub struct CompiledFunction {
    /// Human-readable signature, e.g. `f(integer, text)`.
    pub signature: String,
    pub oid: Oid,
    pub trigger: TriggerKind,
    /// Resolved return type; invalid for DML triggers, whose return type is
    /// unknowable until fired.
    pub return_type: Oid,
    pub return_by_value: bool,
    /// Return type storage width; -1 for variable-length.
    pub return_len: i16,
    pub traits: FunctionTraits,
    pub input_collation: Option<Oid>,

    /// Every datum the routine can touch, by id.
    pub datums: Vec<Datum>,
    /// Datums of the declared input arguments, in declaration order.
    pub arg_datums: Vec<DatumId>,
    /// The unified output: the single OUT parameter's datum, or the
    /// synthesized row over all of them.
    pub out_param: Option<DatumId>,
    /// The magic `found` status variable.
    pub found: DatumId,
    /// Trigger row records, for DML triggers.
    pub new_record: Option<DatumId>,
    pub old_record: Option<DatumId>,

    /// The parsed body. Opaque to the compiler beyond block structure.
    pub action: Block,
    pub nstatements: u32,

    pub resolution_policy: ResolutionPolicy,
    pub print_strict_params: bool,
    pub extra_warnings: bool,
    pub extra_errors: bool,

    /// How many datums qualify for the executor's flat state copy, as a
    /// pre-allocation hint.
    pub copiable_count: usize,
}

impl CompiledFunction {
    /// Look up a datum by id.
    pub fn datum(&self, id: DatumId) -> &Datum {
        &self.datums[id.index()]
    }

    /// Number of datums in the function.
    pub fn datum_count(&self) -> usize {
        self.datums.len()
    }
}
