//! Patchable method identity and signature descriptions
//!
//! A method in the host process is identified by the address the host
//! dispatches through plus a calling-convention signature. Addresses are
//! carried as plain `usize` so identity values stay `Send`/`Sync` and can be
//! used as map keys without unsafe marker impls.

use std::fmt;

/// Calling convention of a patchable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallConv {
    /// The platform C convention.
    #[default]
    C,
    /// The platform "system" convention (stdcall on 32-bit Windows).
    System,
}

/// Coarse value classification used in signature descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Void,
    Int,
    Float,
    Pointer,
}

/// Parameter and return description of a patchable function.
///
/// This is deliberately coarse: the engine only needs enough information to
/// check that a requested trampoline shape is call-compatible with the
/// method it forwards to, not to marshal values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    conv: CallConv,
    params: Vec<ValueKind>,
    ret: ValueKind,
}

impl Signature {
    pub fn new(conv: CallConv, params: Vec<ValueKind>, ret: ValueKind) -> Self {
        Self { conv, params, ret }
    }

    /// Signature of a `fn()` with the default convention.
    pub fn nullary() -> Self {
        Self::new(CallConv::default(), Vec::new(), ValueKind::Void)
    }

    pub fn conv(&self) -> CallConv {
        self.conv
    }

    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    pub fn ret(&self) -> ValueKind {
        self.ret
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether a stub with this signature can forward to `other` unchanged.
    pub fn call_compatible(&self, other: &Signature) -> bool {
        self.conv == other.conv && self.params == other.params && self.ret == other.ret
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::nullary()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conv = match self.conv {
            CallConv::C => "c",
            CallConv::System => "system",
        };
        write!(f, "{}(", conv)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", kind_name(*p))?;
        }
        write!(f, ")->{}", kind_name(self.ret))
    }
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Void => "void",
        ValueKind::Int => "int",
        ValueKind::Float => "float",
        ValueKind::Pointer => "ptr",
    }
}

/// Address of an executable entry point.
///
/// Values of this type are produced by the host patcher (original bodies,
/// rewritten bodies) or by callers registering replacement behavior; the
/// engine never dereferences them, it only routes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry(pub usize);

impl Entry {
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identity of a patchable function in the host process.
///
/// Two hooks with equal `MethodId` values share one ordering chain. For a
/// slot-dispatching host the address is the slot, not the code it currently
/// points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    addr: usize,
    sig: Signature,
}

impl MethodId {
    pub fn new(addr: usize, sig: Signature) -> Self {
        Self { addr, sig }
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    pub fn sig(&self) -> &Signature {
        &self.sig
    }

    pub fn is_null(&self) -> bool {
        self.addr == 0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}/{}", self.addr, self.sig)
    }
}
