//! Integer enumeration decoding.
//!
//! Devices extend CIM value maps faster than clients learn them, so a lookup
//! miss yields [`UNRECOGNIZED`] instead of an error. All tables live in one
//! [`EnumRegistry`] keyed by type tag and built once.

use crate::error::{Result, WsmanError};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use tracing::trace;

/// Returned for any value (or type tag) without a symbol.
pub const UNRECOGNIZED: &str = "Value not recognized";

/// A compiled-in value map for one enumeration type.
#[derive(Debug)]
pub struct SymbolTable {
    tag: &'static str,
    entries: &'static [(i64, &'static str)],
}

impl SymbolTable {
    pub const fn new(tag: &'static str, entries: &'static [(i64, &'static str)]) -> Self {
        Self { tag, entries }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn entries(&self) -> &'static [(i64, &'static str)] {
        self.entries
    }

    pub fn lookup(&self, value: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, name)| *name)
    }

    pub fn decode(&self, value: i64) -> &'static str {
        self.lookup(value).unwrap_or(UNRECOGNIZED)
    }

    /// Reverse lookup by symbolic name.
    pub fn encode(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(v, _)| *v)
    }
}

/// Type tag binding a Rust marker type to a registry table.
pub trait EnumKind {
    const TAG: &'static str;
}

/// Registry of symbol tables looked up by type tag.
#[derive(Debug, Default)]
pub struct EnumRegistry {
    tables: HashMap<&'static str, &'static SymbolTable>,
}

static GLOBAL: OnceCell<EnumRegistry> = OnceCell::new();

impl EnumRegistry {
    pub fn builder() -> EnumRegistryBuilder {
        EnumRegistryBuilder { tables: Vec::new() }
    }

    /// Registry holding only the generic CIM tables of this crate.
    pub fn standard() -> Self {
        Self::builder().standard_tables().build()
    }

    /// Install the process-wide registry. Fails if one is already in use.
    pub fn install(registry: EnumRegistry) -> std::result::Result<(), EnumRegistry> {
        GLOBAL.set(registry)
    }

    /// The process-wide registry; the standard one unless another was installed first.
    pub fn global() -> &'static EnumRegistry {
        GLOBAL.get_or_init(EnumRegistry::standard)
    }

    pub fn table(&self, tag: &str) -> Option<&'static SymbolTable> {
        self.tables.get(tag).copied()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.tables.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Decode `value` of type `tag`. Never fails.
    pub fn decode(&self, tag: &str, value: i64) -> &'static str {
        match self.table(tag) {
            Some(table) => {
                let name = table.decode(value);
                if name == UNRECOGNIZED {
                    trace!(tag, value, "enum value not in symbol table");
                }
                name
            }
            None => {
                trace!(tag, value, "unknown enum type tag");
                UNRECOGNIZED
            }
        }
    }
}

/// Collects tables; later registrations replace earlier ones with the same tag.
pub struct EnumRegistryBuilder {
    tables: Vec<&'static SymbolTable>,
}

impl EnumRegistryBuilder {
    pub fn table(mut self, table: &'static SymbolTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn standard_tables(self) -> Self {
        STANDARD_TABLES.iter().fold(self, |b, t| b.table(*t))
    }

    pub fn build(self) -> EnumRegistry {
        EnumRegistry {
            tables: self.tables.into_iter().map(|t| (t.tag, t)).collect(),
        }
    }
}

/// Decode through the process-wide registry.
pub fn decode(tag: &str, value: i64) -> &'static str {
    EnumRegistry::global().decode(tag, value)
}

pub fn decode_kind<K: EnumKind>(value: i64) -> &'static str {
    decode(K::TAG, value)
}

/// An enum-typed field: the raw wire integer plus its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumField<K> {
    value: i64,
    _kind: PhantomData<K>,
}

impl<K: EnumKind> EnumField<K> {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            _kind: PhantomData,
        }
    }

    /// Parse the element text of an enum-typed property.
    pub fn from_text(text: &str) -> Result<Self> {
        text.trim().parse().map(Self::new).map_err(|_| {
            WsmanError::MalformedResponse(format!("{} value {:?} is not an integer", K::TAG, text))
        })
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn name(&self) -> &'static str {
        decode(K::TAG, self.value)
    }

    pub fn is_recognized(&self) -> bool {
        EnumRegistry::global()
            .table(K::TAG)
            .and_then(|t| t.lookup(self.value))
            .is_some()
    }
}

impl<K: EnumKind> fmt::Display for EnumField<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! enum_kinds {
    ($($(#[$doc:meta])* $kind:ident => $table:ident,)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $kind;

            impl EnumKind for $kind {
                const TAG: &'static str = stringify!($kind);
            }
        )*

        static STANDARD_TABLES: Lazy<Vec<&'static SymbolTable>> = Lazy::new(|| vec![$(&$table),*]);
    };
}

enum_kinds! {
    /// Generic CIM method ReturnValue codes.
    ReturnValueCode => RETURN_VALUE,
    /// CIM_EnabledLogicalElement.EnabledState
    EnabledState => ENABLED_STATE,
    /// CIM_EnabledLogicalElement.RequestedState
    RequestedState => REQUESTED_STATE,
    /// CIM_ManagedSystemElement.HealthState
    HealthState => HEALTH_STATE,
    /// CIM_ManagedSystemElement.OperationalStatus
    OperationalStatus => OPERATIONAL_STATUS,
    /// CIM_AssociatedPowerManagementService.PowerState
    PowerState => POWER_STATE,
}

static RETURN_VALUE: SymbolTable = SymbolTable::new(
    "ReturnValueCode",
    &[
        (0, "Completed with No Error"),
        (1, "Not Supported"),
        (2, "Unknown or Unspecified Error"),
        (3, "Cannot complete within Timeout Period"),
        (4, "Failed"),
        (5, "Invalid Parameter"),
        (6, "In Use"),
        (4096, "Method Parameters Checked - Job Started"),
        (4097, "Invalid State Transition"),
        (4098, "Use of Timeout Parameter Not Supported"),
        (4099, "Busy"),
    ],
);

static ENABLED_STATE: SymbolTable = SymbolTable::new(
    "EnabledState",
    &[
        (0, "Unknown"),
        (1, "Other"),
        (2, "Enabled"),
        (3, "Disabled"),
        (4, "Shutting Down"),
        (5, "Not Applicable"),
        (6, "Enabled but Offline"),
        (7, "In Test"),
        (8, "Deferred"),
        (9, "Quiesce"),
        (10, "Starting"),
    ],
);

static REQUESTED_STATE: SymbolTable = SymbolTable::new(
    "RequestedState",
    &[
        (0, "Unknown"),
        (2, "Enabled"),
        (3, "Disabled"),
        (4, "Shut Down"),
        (5, "No Change"),
        (6, "Offline"),
        (7, "Test"),
        (8, "Deferred"),
        (9, "Quiesce"),
        (10, "Reboot"),
        (11, "Reset"),
        (12, "Not Applicable"),
    ],
);

static HEALTH_STATE: SymbolTable = SymbolTable::new(
    "HealthState",
    &[
        (0, "Unknown"),
        (5, "OK"),
        (10, "Degraded/Warning"),
        (15, "Minor failure"),
        (20, "Major failure"),
        (25, "Critical failure"),
        (30, "Non-recoverable error"),
    ],
);

static OPERATIONAL_STATUS: SymbolTable = SymbolTable::new(
    "OperationalStatus",
    &[
        (0, "Unknown"),
        (1, "Other"),
        (2, "OK"),
        (3, "Degraded"),
        (4, "Stressed"),
        (5, "Predictive Failure"),
        (6, "Error"),
        (7, "Non-Recoverable Error"),
        (8, "Starting"),
        (9, "Stopping"),
        (10, "Stopped"),
        (11, "In Service"),
        (12, "No Contact"),
        (13, "Lost Communication"),
        (14, "Aborted"),
        (15, "Dormant"),
        (16, "Supporting Entity in Error"),
        (17, "Completed"),
        (18, "Power Mode"),
        (19, "Relocating"),
    ],
);

static POWER_STATE: SymbolTable = SymbolTable::new(
    "PowerState",
    &[
        (1, "Other"),
        (2, "On"),
        (3, "Sleep - Light"),
        (4, "Sleep - Deep"),
        (5, "Power Cycle (Off - Soft)"),
        (6, "Off - Hard"),
        (7, "Hibernate (Off - Soft)"),
        (8, "Off - Soft"),
        (9, "Power Cycle (Off - Hard)"),
        (10, "Master Bus Reset"),
        (11, "Diagnostic Interrupt (NMI)"),
        (12, "Off - Soft Graceful"),
        (13, "Off - Hard Graceful"),
        (14, "Master Bus Reset Graceful"),
        (15, "Power Cycle (Off - Soft Graceful)"),
        (16, "Power Cycle (Off - Hard Graceful)"),
    ],
);
