//! x86-64 register model: a closed enumeration of GPR aliases plus the
//! alias table that maps each one to its 64-bit parent and byte range.
//!
//! Re-architected per the redesign notes: rather than a chain of
//! `if name == "eax" || ...` checks scattered across reader/writer code,
//! every alias is resolved through one table (`Register::alias_info`).

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    Rax, Rbx, Rcx, Rdx, Rsi, Rdi, Rsp, Rbp,
    R8, R9, R10, R11, R12, R13, R14, R15,

    Eax, Ebx, Ecx, Edx, Esi, Edi, Esp, Ebp,
    R8d, R9d, R10d, R11d, R12d, R13d, R14d, R15d,

    Ax, Bx, Cx, Dx, Si, Di, Bp, Sp,
    R8w, R9w, R10w, R11w, R12w, R13w, R14w, R15w,

    Al, Bl, Cl, Dl, Sil, Dil, Bpl, Spl,
    R8b, R9b, R10b, R11b, R12b, R13b, R14b, R15b,

    Ah, Bh, Ch, Dh,

    St0, St1, St2, St3, St4, St5,

    Cs, Ds, Es, Fs, Gs, Ss,

    Unknown,
}

/// How an alias sits inside its 64-bit parent: the inclusive byte range it
/// occupies, and whether reading/writing it needs the extra 8-bit shift
/// that `ah`/`bh`/`ch`/`dh` require.
pub struct AliasInfo {
    pub parent: Register,
    pub byte_range: (u8, u8),
    pub high_shift: bool,
}

/// All 16 parent registers, in the order the trace line's register fields
/// appear (rax, rbx, ..., r15).
pub const PARENT_REGISTERS: [Register; 16] = [
    Register::Rax, Register::Rbx, Register::Rcx, Register::Rdx,
    Register::Rsi, Register::Rdi, Register::Rsp, Register::Rbp,
    Register::R8, Register::R9, Register::R10, Register::R11,
    Register::R12, Register::R13, Register::R14, Register::R15,
];

impl Register {
    /// Resolve an alias to its parent register and the byte range (and
    /// high-shift flag) it occupies within that parent. Returns `None` for
    /// parent registers themselves (they have no alias relationship to
    /// resolve) and for non-GPR tags (x87/segment/unknown).
    pub fn alias_info(self) -> Option<AliasInfo> {
        use Register::*;
        let (parent, byte_range, high_shift) = match self {
            Eax => (Rax, (0, 3), false), Ebx => (Rbx, (0, 3), false),
            Ecx => (Rcx, (0, 3), false), Edx => (Rdx, (0, 3), false),
            Esi => (Rsi, (0, 3), false), Edi => (Rdi, (0, 3), false),
            Esp => (Rsp, (0, 3), false), Ebp => (Rbp, (0, 3), false),
            R8d => (R8, (0, 3), false), R9d => (R9, (0, 3), false),
            R10d => (R10, (0, 3), false), R11d => (R11, (0, 3), false),
            R12d => (R12, (0, 3), false), R13d => (R13, (0, 3), false),
            R14d => (R14, (0, 3), false), R15d => (R15, (0, 3), false),

            Ax => (Rax, (0, 1), false), Bx => (Rbx, (0, 1), false),
            Cx => (Rcx, (0, 1), false), Dx => (Rdx, (0, 1), false),
            Si => (Rsi, (0, 1), false), Di => (Rdi, (0, 1), false),
            Bp => (Rbp, (0, 1), false), Sp => (Rsp, (0, 1), false),
            R8w => (R8, (0, 1), false), R9w => (R9, (0, 1), false),
            R10w => (R10, (0, 1), false), R11w => (R11, (0, 1), false),
            R12w => (R12, (0, 1), false), R13w => (R13, (0, 1), false),
            R14w => (R14, (0, 1), false), R15w => (R15, (0, 1), false),

            Al => (Rax, (0, 0), false), Bl => (Rbx, (0, 0), false),
            Cl => (Rcx, (0, 0), false), Dl => (Rdx, (0, 0), false),
            Sil => (Rsi, (0, 0), false), Dil => (Rdi, (0, 0), false),
            Bpl => (Rbp, (0, 0), false), Spl => (Rsp, (0, 0), false),
            R8b => (R8, (0, 0), false), R9b => (R9, (0, 0), false),
            R10b => (R10, (0, 0), false), R11b => (R11, (0, 0), false),
            R12b => (R12, (0, 0), false), R13b => (R13, (0, 0), false),
            R14b => (R14, (0, 0), false), R15b => (R15, (0, 0), false),

            Ah => (Rax, (1, 1), true), Bh => (Rbx, (1, 1), true),
            Ch => (Rcx, (1, 1), true), Dh => (Rdx, (1, 1), true),

            _ => return None,
        };
        Some(AliasInfo { parent, byte_range, high_shift })
    }

    /// Is `self` one of the 16 64-bit parent registers?
    pub fn is_parent(self) -> bool {
        PARENT_REGISTERS.contains(&self)
    }

    /// Bit width of this alias: 64 for parents, else derived from its
    /// byte range.
    pub fn bit_width(self) -> u32 {
        if self.is_parent() {
            return 64;
        }
        match self.alias_info() {
            Some(info) => (info.byte_range.1 - info.byte_range.0 + 1) as u32 * 8,
            None => 0,
        }
    }

    pub fn from_name(name: &str) -> Option<Register> {
        use Register::*;
        Some(match name {
            "rax" => Rax, "rbx" => Rbx, "rcx" => Rcx, "rdx" => Rdx,
            "rsi" => Rsi, "rdi" => Rdi, "rsp" => Rsp, "rbp" => Rbp,
            "r8" => R8, "r9" => R9, "r10" => R10, "r11" => R11,
            "r12" => R12, "r13" => R13, "r14" => R14, "r15" => R15,

            "eax" => Eax, "ebx" => Ebx, "ecx" => Ecx, "edx" => Edx,
            "esi" => Esi, "edi" => Edi, "esp" => Esp, "ebp" => Ebp,
            "r8d" => R8d, "r9d" => R9d, "r10d" => R10d, "r11d" => R11d,
            "r12d" => R12d, "r13d" => R13d, "r14d" => R14d, "r15d" => R15d,

            "ax" => Ax, "bx" => Bx, "cx" => Cx, "dx" => Dx,
            "si" => Si, "di" => Di, "bp" => Bp, "sp" => Sp,
            "r8w" => R8w, "r9w" => R9w, "r10w" => R10w, "r11w" => R11w,
            "r12w" => R12w, "r13w" => R13w, "r14w" => R14w, "r15w" => R15w,

            "al" => Al, "bl" => Bl, "cl" => Cl, "dl" => Dl,
            "sil" => Sil, "dil" => Dil, "bpl" => Bpl, "spl" => Spl,
            "r8b" => R8b, "r9b" => R9b, "r10b" => R10b, "r11b" => R11b,
            "r12b" => R12b, "r13b" => R13b, "r14b" => R14b, "r15b" => R15b,

            "ah" => Ah, "bh" => Bh, "ch" => Ch, "dh" => Dh,

            "cs" => Cs, "ds" => Ds, "es" => Es, "fs" => Fs, "gs" => Gs, "ss" => Ss,

            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use Register::*;
        match self {
            Rax => "rax", Rbx => "rbx", Rcx => "rcx", Rdx => "rdx",
            Rsi => "rsi", Rdi => "rdi", Rsp => "rsp", Rbp => "rbp",
            R8 => "r8", R9 => "r9", R10 => "r10", R11 => "r11",
            R12 => "r12", R13 => "r13", R14 => "r14", R15 => "r15",

            Eax => "eax", Ebx => "ebx", Ecx => "ecx", Edx => "edx",
            Esi => "esi", Edi => "edi", Esp => "esp", Ebp => "ebp",
            R8d => "r8d", R9d => "r9d", R10d => "r10d", R11d => "r11d",
            R12d => "r12d", R13d => "r13d", R14d => "r14d", R15d => "r15d",

            Ax => "ax", Bx => "bx", Cx => "cx", Dx => "dx",
            Si => "si", Di => "di", Bp => "bp", Sp => "sp",
            R8w => "r8w", R9w => "r9w", R10w => "r10w", R11w => "r11w",
            R12w => "r12w", R13w => "r13w", R14w => "r14w", R15w => "r15w",

            Al => "al", Bl => "bl", Cl => "cl", Dl => "dl",
            Sil => "sil", Dil => "dil", Bpl => "bpl", Spl => "spl",
            R8b => "r8b", R9b => "r9b", R10b => "r10b", R11b => "r11b",
            R12b => "r12b", R13b => "r13b", R14b => "r14b", R15b => "r15b",

            Ah => "ah", Bh => "bh", Ch => "ch", Dh => "dh",

            St0 => "st0", St1 => "st1", St2 => "st2", St3 => "st3", St4 => "st4", St5 => "st5",

            Cs => "cs", Ds => "ds", Es => "es", Fs => "fs", Gs => "gs", Ss => "ss",

            Unknown => "unknown",
        }
    }

    /// Index of the parent register among `PARENT_REGISTERS`, i.e. its
    /// position in the trace line's 16 register fields.
    pub fn parent_index(self) -> Option<usize> {
        let parent = if self.is_parent() { self } else { self.alias_info()?.parent };
        PARENT_REGISTERS.iter().position(|&r| r == parent)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
