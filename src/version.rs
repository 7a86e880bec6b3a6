use bitflags::bitflags;

use std::cmp::Ordering;
use std::fmt;

/// Describes a version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Version(pub Api, pub u8, pub u8);

/// Describes the corresponding API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Api {
    /// Desktop OpenGL.
    Gl,
    /// OpenGL ES.
    GlEs,
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        if self.0 != other.0 {
            return None;
        }

        match self.1.cmp(&other.1) {
            Ordering::Equal => Some(self.2.cmp(&other.2)),
            a => Some(a)
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Api::Gl => write!(fmt, "{}.{}", self.1, self.2),
            Api::GlEs => write!(fmt, "ES {}.{}", self.1, self.2),
        }
    }
}

/// Returns the highest minor version that exists for the given major version.
#[inline]
pub fn max_minor(api: Api, major: u8) -> Option<u8> {
    match (api, major) {
        (Api::Gl, 1) => Some(5),
        (Api::Gl, 2) => Some(1),
        (Api::Gl, 3) => Some(3),
        (Api::Gl, 4) => Some(6),
        (Api::GlEs, 1) => Some(1),
        (Api::GlEs, 2) => Some(0),
        (Api::GlEs, 3) => Some(2),
        _ => None,
    }
}

impl Version {
    /// Returns true if this version has ever been released.
    #[inline]
    pub fn is_valid(&self) -> bool {
        max_minor(self.0, self.1).map_or(false, |max| self.2 <= max)
    }

    /// Returns the version right below this one, or `None` if this is the lowest version.
    ///
    /// For example 3.0 becomes 2.1, and 2.0 becomes 1.5.
    pub fn decrement(&self) -> Option<Version> {
        let Version(api, major, minor) = *self;

        let previous = if minor > 0 {
            Version(api, major, minor - 1)
        } else {
            let major = major.checked_sub(1)?;
            Version(api, major, max_minor(api, major)?)
        };

        if previous.is_valid() { Some(previous) } else { None }
    }

    /// Parses the version number out of a string returned by the driver.
    ///
    /// The first number pair separated by `.` or `_` is used, so that both
    /// `"4.5 (Core Profile) Mesa 21.0"` and `"GL_VERSION_3_3"` are understood. A string
    /// starting with `OpenGL ES` produces an `Api::GlEs` version. A missing minor number
    /// defaults to 0.
    pub fn parse(string: &str) -> Option<Version> {
        let (api, rest) = match string.trim_start().strip_prefix("OpenGL ES") {
            Some(rest) => (Api::GlEs, rest),
            None => (Api::Gl, string),
        };

        let start = rest.find(|c: char| c.is_ascii_digit())?;
        let rest = &rest[start ..];

        let major_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let major = rest[.. major_len].parse().ok()?;
        let rest = &rest[major_len ..];

        let minor = match rest.chars().next() {
            Some('.') | Some('_') => {
                let rest = &rest[1 ..];
                let minor_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
                if minor_len == 0 {
                    0
                } else {
                    rest[.. minor_len].parse().ok()?
                }
            },
            _ => 0,
        };

        Some(Version(api, major, minor))
    }
}

bitflags! {
    /// Profile options of a context, as requested from or granted by the driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProfileFlags: u32 {
        /// Compatibility profile, the legacy fixed-function API is available.
        const COMPAT = 1 << 0;
        /// Core profile.
        const CORE = 1 << 1;
        /// Forward-compatible, deprecated functions are removed.
        const FORWARD = 1 << 2;
        /// Any implementation is accepted, hardware or software.
        const ANY = 1 << 3;
        /// The context was created through the versioned (ARB) creation entry point.
        const ARB_CREATED = 1 << 4;
    }
}

impl fmt::Display for ProfileFlags {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (ProfileFlags::COMPAT, "compat"),
            (ProfileFlags::CORE, "core"),
            (ProfileFlags::FORWARD, "forward"),
            (ProfileFlags::ANY, "any"),
            (ProfileFlags::ARB_CREATED, "arb"),
        ];

        let mut first = true;
        for &(flag, name) in names.iter() {
            if self.contains(flag) {
                if !first {
                    fmt.write_str(", ")?;
                }
                fmt.write_str(name)?;
                first = false;
            }
        }

        if first {
            fmt.write_str("none")?;
        }

        Ok(())
    }
}

/// The version and profile of a context, as obtained by negotiating with the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedVersion {
    /// The version of the context.
    pub version: Version,

    /// The profile options that were used to create the context. They can differ from the
    /// ones that were requested.
    pub profile: ProfileFlags,

    /// The raw `GL_VERSION` string of the driver. `None` if the driver didn't report one or if
    /// the context hasn't been bound yet.
    pub driver_string: Option<String>,
}

impl NegotiatedVersion {
    /// Builds the value for a context that was created with the given version and profile.
    #[inline]
    pub fn created(version: Version, profile: ProfileFlags) -> NegotiatedVersion {
        NegotiatedVersion {
            version: version,
            profile: profile,
            driver_string: None,
        }
    }

    /// Merges the version string reported by the driver after the first bind.
    ///
    /// A context created through the versioned entry point keeps the created version unless
    /// the driver reports a lower one. A legacy context takes the version from the string. If
    /// the string is missing or can't be parsed, legacy contexts are treated as 1.0.
    pub fn with_driver_string(self, string: Option<String>) -> NegotiatedVersion {
        let parsed = string.as_ref().and_then(|s| Version::parse(s));

        let version = match parsed {
            Some(parsed) if self.is_arb_created() => {
                match parsed.partial_cmp(&self.version) {
                    Some(Ordering::Less) => parsed,
                    _ => self.version,
                }
            },
            Some(parsed) => parsed,
            None if self.is_arb_created() => self.version,
            None => Version(self.version.0, 1, 0),
        };

        NegotiatedVersion {
            version: version,
            profile: self.profile,
            driver_string: string,
        }
    }

    /// Returns true for a core profile context.
    #[inline]
    pub fn is_core(&self) -> bool {
        self.profile.contains(ProfileFlags::CORE)
    }

    /// Returns true for a compatibility profile context.
    #[inline]
    pub fn is_compat(&self) -> bool {
        self.profile.contains(ProfileFlags::COMPAT)
    }

    /// Returns true for a forward-compatible context.
    #[inline]
    pub fn is_forward_compatible(&self) -> bool {
        self.profile.contains(ProfileFlags::FORWARD)
    }

    /// Returns true if the context was created through the versioned entry point.
    #[inline]
    pub fn is_arb_created(&self) -> bool {
        self.profile.contains(ProfileFlags::ARB_CREATED)
    }

    /// Returns true if the context can provide the core-profile query entry points, in
    /// other words if it is a desktop 3.1+ context.
    #[inline]
    pub fn is_core_capable(&self) -> bool {
        self.version.0 == Api::Gl && self.version >= Version(Api::Gl, 3, 1)
    }

    /// Returns a human-readable description, for example
    /// `4.5 (core, any, arb) - 4.5 (Core Profile) Mesa 21.0`.
    pub fn version_string(&self) -> String {
        match self.driver_string {
            Some(ref driver) => format!("{} ({}) - {}", self.version, self.profile, driver),
            None => format!("{} ({})", self.version, self.profile),
        }
    }
}

impl fmt::Display for NegotiatedVersion {
    #[inline]
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.version_string())
    }
}
