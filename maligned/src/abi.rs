use crate::helpe::*;

/// The machine we are computing layouts for. Built once, never changed,
/// shared by every computation.
///
/// Both numbers are powers of two. Nothing else about the target
/// matters to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbiParams {
    word_size:  ByteSize,
    max_align:  ByteSize,
}

impl AbiParams {
    /// Builds parameters for a custom machine.
    pub fn new(word_size: ByteSize, max_align: ByteSize) -> Result<Self, ConfigError> {
        if !word_size.is_power_of_two() {
            return Err(ConfigError::BadWordSize(word_size));
        }
        if !max_align.is_power_of_two() {
            return Err(ConfigError::BadMaxAlign(max_align));
        }

        Ok(Self { word_size, max_align })
    }

    /// Builds parameters for a named profile. Names follow `GOARCH`.
    pub fn for_profile(name: &str) -> Result<Self, ConfigError> {
        let profile: Profile = name.parse()?;

        Ok(profile.params())
    }

    #[inline(always)]
    pub fn word_size(&self) -> ByteSize {
        self.word_size
    }

    #[inline(always)]
    pub fn max_align(&self) -> ByteSize {
        self.max_align
    }
}

impl Default for AbiParams {
    /// 64-bit, 8-byte aligned.
    fn default() -> Self {
        Profile::Amd64.params()
    }
}

/// The machine profiles we know by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Amd64,
    Arm64,
    Ppc64,
    Ppc64le,
    Mips64,
    Mips64le,
    Riscv64,
    S390x,
    Loong64,
    Wasm,
    I386,
    Arm,
    Mips,
    Mipsle,
    /// 32-bit pointers on a 64-bit machine: narrow words,
    /// wide alignment.
    Amd64p32,
}

impl Profile {
    pub const ALL: [Profile; 15] = [
        Profile::Amd64, Profile::Arm64, Profile::Ppc64, Profile::Ppc64le,
        Profile::Mips64, Profile::Mips64le, Profile::Riscv64, Profile::S390x,
        Profile::Loong64, Profile::Wasm, Profile::I386, Profile::Arm,
        Profile::Mips, Profile::Mipsle, Profile::Amd64p32,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Amd64      => "amd64",
            Profile::Arm64      => "arm64",
            Profile::Ppc64      => "ppc64",
            Profile::Ppc64le    => "ppc64le",
            Profile::Mips64     => "mips64",
            Profile::Mips64le   => "mips64le",
            Profile::Riscv64    => "riscv64",
            Profile::S390x      => "s390x",
            Profile::Loong64    => "loong64",
            Profile::Wasm       => "wasm",
            Profile::I386       => "386",
            Profile::Arm        => "arm",
            Profile::Mips       => "mips",
            Profile::Mipsle     => "mipsle",
            Profile::Amd64p32   => "amd64p32",
        }
    }

    /// This is the one place target-specific numbers are chosen.
    pub fn params(&self) -> AbiParams {
        let (word_size, max_align) = match self {
            Profile::I386 | Profile::Arm | Profile::Mips | Profile::Mipsle  => (4, 4),
            Profile::Amd64p32                                               => (4, 8),
            _                                                               => (8, 8),
        };

        AbiParams { word_size, max_align }
    }
}

impl std::str::FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .iter()
            .find(|p| p.name() == s)
            .copied()
            .ok_or_else(|| ConfigError::UnknownProfile(s.to_string()))
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
