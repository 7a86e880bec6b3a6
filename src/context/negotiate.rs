/*!
Negotiation of the version and profile of a new context.

Drivers refuse to create contexts for versions or profiles they don't support, and don't
tell which ones they would accept. The negotiation starts at the highest version allowed by
the request and walks down one version at a time until the driver returns a context. If the
whole ladder is refused, it is walked again with different profile options.

*/
use smallvec::SmallVec;

use std::error::Error;
use std::fmt;

use crate::version::{Api, NegotiatedVersion, ProfileFlags, Version};

/// A family of profiles that a drawable or a context can ask for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlProfile {
    /// Legacy OpenGL between 1.1 and 3.0, fixed-function pipeline available.
    Gl2,
    /// OpenGL 3.1 to 3.3, core profile.
    Gl3,
    /// OpenGL 3.1 to 3.3, backward-compatible.
    Gl3bc,
    /// OpenGL 4.x, core profile.
    Gl4,
    /// OpenGL 4.x, backward-compatible.
    Gl4bc,
}

impl GlProfile {
    /// Returns the version request corresponding to this profile.
    pub fn request(&self) -> VersionRequest {
        match *self {
            GlProfile::Gl2 => VersionRequest::compat((3, 0), (1, 1)),
            GlProfile::Gl3 => VersionRequest::core((3, 3), (3, 1)),
            GlProfile::Gl3bc => VersionRequest::compat((3, 3), (3, 1)),
            GlProfile::Gl4 => VersionRequest::core((4, 6), (4, 0)),
            GlProfile::Gl4bc => VersionRequest::compat((4, 6), (4, 0)),
        }
    }

    /// Returns true if a context with the given version can render for this profile.
    ///
    /// The version must be at least the minimum version of the profile. A backward-compatible
    /// profile additionally refuses contexts that only provide the core profile.
    pub fn is_satisfied_by(&self, negotiated: &NegotiatedVersion) -> bool {
        let request = self.request();

        if negotiated.version.0 != Api::Gl || negotiated.version < request.floor() {
            return false;
        }

        if request.backward_compatible && negotiated.is_core() && !negotiated.is_compat() {
            return false;
        }

        true
    }
}

/// Range of versions and compatibility requirement for a new context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VersionRequest {
    /// Highest version to try.
    pub ceiling: (u8, u8),
    /// Lowest acceptable version.
    pub floor: (u8, u8),
    /// Whether the legacy API must remain available.
    pub backward_compatible: bool,
}

impl VersionRequest {
    /// Requests a core profile context between `ceiling` and `floor`.
    #[inline]
    pub fn core(ceiling: (u8, u8), floor: (u8, u8)) -> VersionRequest {
        VersionRequest {
            ceiling: ceiling,
            floor: floor,
            backward_compatible: false,
        }
    }

    /// Requests a compatibility profile context between `ceiling` and `floor`.
    #[inline]
    pub fn compat(ceiling: (u8, u8), floor: (u8, u8)) -> VersionRequest {
        VersionRequest {
            ceiling: ceiling,
            floor: floor,
            backward_compatible: true,
        }
    }

    #[inline]
    fn ceiling(&self) -> Version {
        Version(Api::Gl, self.ceiling.0, self.ceiling.1)
    }

    #[inline]
    fn floor(&self) -> Version {
        Version(Api::Gl, self.floor.0, self.floor.1)
    }

    /// Returns the successive profile options that are tried, in order.
    pub fn profile_ladder(&self) -> SmallVec<[ProfileFlags; 3]> {
        let mut ladder = SmallVec::new();

        if self.backward_compatible {
            ladder.push(ProfileFlags::COMPAT);
        } else {
            ladder.push(ProfileFlags::CORE | ProfileFlags::ANY);
            ladder.push(ProfileFlags::CORE | ProfileFlags::FORWARD);
            // last resort, even if it wasn't requested
            ladder.push(ProfileFlags::COMPAT | ProfileFlags::ANY);
        }

        ladder
    }

    /// Returns the versions that are tried for each profile, from the highest to the lowest.
    ///
    /// A ceiling with a minor version that was never released is clamped to the highest
    /// existing minor version.
    pub fn version_ladder(&self) -> SmallVec<[Version; 16]> {
        let mut ladder = SmallVec::new();

        let mut current = {
            let ceiling = self.ceiling();
            match crate::version::max_minor(Api::Gl, ceiling.1) {
                Some(max) if ceiling.2 > max => Version(Api::Gl, ceiling.1, max),
                _ => ceiling,
            }
        };

        if !current.is_valid() {
            return ladder;
        }

        let floor = self.floor();
        while current >= floor {
            ladder.push(current);
            current = match current.decrement() {
                Some(v) => v,
                None => break,
            };
        }

        ladder
    }
}

/// One attempt at creating a context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Attempt {
    /// Major version passed to the driver.
    pub major: u8,
    /// Minor version passed to the driver.
    pub minor: u8,
    /// Profile options passed to the driver.
    pub profile: ProfileFlags,
}

impl fmt::Display for Attempt {
    #[inline]
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{} ({})", self.major, self.minor, self.profile)
    }
}

/// Error returned when the driver refused every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoCompatibleContext {
    /// The request that couldn't be satisfied.
    pub request: VersionRequest,
    /// Every attempt, in the order they were made. Empty for a refused legacy creation.
    pub attempts: Vec<Attempt>,
}

impl fmt::Display for NoCompatibleContext {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "The driver refused to create a context for versions {}.{} to {}.{}",
               self.request.ceiling.0, self.request.ceiling.1,
               self.request.floor.0, self.request.floor.1)?;

        if self.attempts.is_empty() {
            return fmt.write_str(" (legacy creation)");
        }

        fmt.write_str(", attempted:")?;
        for attempt in self.attempts.iter() {
            write!(fmt, " {};", attempt)?;
        }
        Ok(())
    }
}

impl Error for NoCompatibleContext {}

/// Creates native contexts on behalf of the negotiation.
pub trait ContextFactory {
    /// The native context that is produced.
    type Handle;

    /// Returns true if contexts can be created with an explicit version and profile.
    fn supports_versioned_creation(&self) -> bool;

    /// Tries to create a context with the given version and profile. Returns `None` if the
    /// driver refuses.
    fn create_versioned(&mut self, attempt: &Attempt) -> Option<Self::Handle>;

    /// Tries to create a context without specifying any version.
    fn create_legacy(&mut self) -> Option<Self::Handle>;
}

/// Creates a context by walking down the version and profile ladders of `request`.
///
/// If `preferred` is given, it is tried before anything else. This is used to reuse the
/// result of a previous negotiation on the same device.
pub fn negotiate<F>(factory: &mut F, request: &VersionRequest, preferred: Option<&Attempt>)
                    -> Result<(F::Handle, NegotiatedVersion, Attempt), NoCompatibleContext>
                    where F: ContextFactory
{
    if !factory.supports_versioned_creation() {
        return match factory.create_legacy() {
            Some(handle) => {
                // the real version is only known after the first bind
                let version = Version(Api::Gl, request.floor.0, request.floor.1);
                let attempt = Attempt { major: version.1, minor: version.2,
                                        profile: ProfileFlags::COMPAT };
                Ok((handle, NegotiatedVersion::created(version, ProfileFlags::COMPAT), attempt))
            },
            None => Err(NoCompatibleContext { request: *request, attempts: Vec::new() }),
        };
    }

    let mut attempts = Vec::new();

    if let Some(preferred) = preferred {
        if let Some(handle) = factory.create_versioned(preferred) {
            return Ok((handle, negotiated(preferred), *preferred));
        }
        attempts.push(*preferred);
    }

    let versions = request.version_ladder();

    for profile in request.profile_ladder() {
        for version in versions.iter() {
            let attempt = Attempt { major: version.1, minor: version.2, profile: profile };

            if let Some(handle) = factory.create_versioned(&attempt) {
                return Ok((handle, negotiated(&attempt), attempt));
            }

            attempts.push(attempt);
        }
    }

    Err(NoCompatibleContext { request: *request, attempts: attempts })
}

#[inline]
fn negotiated(attempt: &Attempt) -> NegotiatedVersion {
    NegotiatedVersion::created(Version(Api::Gl, attempt.major, attempt.minor),
                               attempt.profile | ProfileFlags::ARB_CREATED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ladder() {
        let ladder = GlProfile::Gl2.request().version_ladder();
        let expected = [(3, 0), (2, 1), (2, 0), (1, 5), (1, 4), (1, 3), (1, 2), (1, 1)];
        assert_eq!(ladder.len(), expected.len());
        for (v, &(major, minor)) in ladder.iter().zip(expected.iter()) {
            assert_eq!(*v, Version(Api::Gl, major, minor));
        }
    }

    #[test]
    fn ceiling_clamped() {
        let ladder = VersionRequest::core((3, 9), (3, 1)).version_ladder();
        assert_eq!(ladder[0], Version(Api::Gl, 3, 3));
        assert_eq!(ladder.len(), 3);
    }

    #[test]
    fn core_profile_ladder() {
        let ladder = GlProfile::Gl3.request().profile_ladder();
        assert_eq!(&ladder[..], &[
            ProfileFlags::CORE | ProfileFlags::ANY,
            ProfileFlags::CORE | ProfileFlags::FORWARD,
            ProfileFlags::COMPAT | ProfileFlags::ANY,
        ]);
    }

    #[test]
    fn compat_profile_ladder() {
        let ladder = GlProfile::Gl4bc.request().profile_ladder();
        assert_eq!(&ladder[..], &[ProfileFlags::COMPAT]);
    }
}
