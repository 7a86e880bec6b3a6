use glctx::context::{negotiate, Attempt, ContextFactory, VersionRequest};
use glctx::{Api, GlProfile, ProfileFlags, Version};

/// Driver accepting the attempts matching a predicate.
struct Driver<F> where F: Fn(&Attempt) -> bool {
    accept: F,
    versioned: bool,
    legacy: bool,
    tried: Vec<Attempt>,
    next_handle: u32,
}

impl<F> Driver<F> where F: Fn(&Attempt) -> bool {
    fn new(accept: F) -> Driver<F> {
        Driver { accept: accept, versioned: true, legacy: true, tried: Vec::new(), next_handle: 1 }
    }
}

impl<F> ContextFactory for Driver<F> where F: Fn(&Attempt) -> bool {
    type Handle = u32;

    fn supports_versioned_creation(&self) -> bool {
        self.versioned
    }

    fn create_versioned(&mut self, attempt: &Attempt) -> Option<u32> {
        self.tried.push(*attempt);
        if (self.accept)(attempt) {
            self.next_handle += 1;
            Some(self.next_handle)
        } else {
            None
        }
    }

    fn create_legacy(&mut self) -> Option<u32> {
        if self.legacy { Some(0) } else { None }
    }
}

fn versions(attempts: &[Attempt]) -> Vec<(u8, u8)> {
    attempts.iter().map(|a| (a.major, a.minor)).collect()
}

#[test]
fn walks_down_to_accepted_version() {
    let mut driver = Driver::new(|a: &Attempt| (a.major, a.minor) <= (4, 1));
    let (_, negotiated, attempt) = negotiate(&mut driver, &GlProfile::Gl4.request(), None).unwrap();

    assert_eq!(versions(&driver.tried), vec![(4, 6), (4, 5), (4, 4), (4, 3), (4, 2), (4, 1)]);
    assert!(driver.tried.iter().all(|a| a.profile == ProfileFlags::CORE | ProfileFlags::ANY));

    assert_eq!(negotiated.version, Version(Api::Gl, 4, 1));
    assert!(negotiated.is_core());
    assert!(negotiated.is_arb_created());
    assert_eq!(attempt, Attempt { major: 4, minor: 1, profile: ProfileFlags::CORE | ProfileFlags::ANY });
}

#[test]
fn core_request_settles_on_lowest_version() {
    // a driver only providing 3.1 core, asked for anything between 4.x and 3.1
    let request = VersionRequest::core((4, 6), (3, 1));
    let mut driver = Driver::new(|a: &Attempt| {
        (a.major, a.minor) == (3, 1) && a.profile.contains(ProfileFlags::CORE)
    });

    let (_, negotiated, _) = negotiate(&mut driver, &request, None).unwrap();

    assert_eq!(versions(&driver.tried),
               vec![(4, 6), (4, 5), (4, 4), (4, 3), (4, 2), (4, 1), (4, 0), (3, 3), (3, 2),
                    (3, 1)]);
    assert_eq!(negotiated.version, Version(Api::Gl, 3, 1));
    assert_eq!(negotiated.profile,
               ProfileFlags::CORE | ProfileFlags::ANY | ProfileFlags::ARB_CREATED);
}

#[test]
fn forward_compatible_fallback() {
    let request = GlProfile::Gl3.request();
    let mut driver = Driver::new(|a: &Attempt| {
        a.profile == ProfileFlags::CORE | ProfileFlags::FORWARD && a.minor == 2
    });

    let (_, negotiated, attempt) = negotiate(&mut driver, &request, None).unwrap();

    // the whole ladder is walked with the first profile before switching
    assert_eq!(driver.tried.len(), 3 + 2);
    assert_eq!(&driver.tried[.. 3].iter().map(|a| a.profile).collect::<Vec<_>>()[..],
               &[ProfileFlags::CORE | ProfileFlags::ANY; 3][..]);
    assert_eq!(attempt.profile, ProfileFlags::CORE | ProfileFlags::FORWARD);
    assert!(negotiated.is_forward_compatible());
    assert_eq!(negotiated.version, Version(Api::Gl, 3, 2));
}

#[test]
fn compatibility_last_resort() {
    let request = GlProfile::Gl3.request();
    let mut driver = Driver::new(|a: &Attempt| a.profile.contains(ProfileFlags::COMPAT));

    let (_, negotiated, attempt) = negotiate(&mut driver, &request, None).unwrap();

    assert_eq!(driver.tried.len(), 3 * 2 + 1);
    assert_eq!(attempt, Attempt { major: 3, minor: 3,
                                  profile: ProfileFlags::COMPAT | ProfileFlags::ANY });
    assert!(negotiated.is_compat());
    assert!(!negotiated.is_core());
}

#[test]
fn compat_request_ladder() {
    let ladder = GlProfile::Gl4bc.request().profile_ladder();
    assert_eq!(&ladder[..], &[ProfileFlags::COMPAT][..]);

    let ladder = GlProfile::Gl4.request().profile_ladder();
    assert_eq!(&ladder[..], &[ProfileFlags::CORE | ProfileFlags::ANY,
                              ProfileFlags::CORE | ProfileFlags::FORWARD,
                              ProfileFlags::COMPAT | ProfileFlags::ANY][..]);
}

#[test]
fn compat_request_walks_a_single_ladder() {
    let request = GlProfile::Gl3bc.request();
    let mut driver = Driver::new(|_: &Attempt| false);

    let err = negotiate(&mut driver, &request, None).unwrap_err();

    assert_eq!(versions(&err.attempts), vec![(3, 3), (3, 2), (3, 1)]);
    assert!(err.attempts.iter().all(|a| a.profile == ProfileFlags::COMPAT));
}

#[test]
fn everything_refused() {
    let request = GlProfile::Gl3.request();
    let mut driver = Driver::new(|_: &Attempt| false);

    let err = negotiate(&mut driver, &request, None).unwrap_err();

    assert_eq!(err.request, request);
    assert_eq!(err.attempts, driver.tried);
    assert_eq!(err.attempts.len(), 3 * 3);
    assert!(err.to_string().contains("3.1"));
}

#[test]
fn legacy_creation() {
    let mut driver = Driver::new(|_: &Attempt| true);
    driver.versioned = false;

    let (handle, negotiated, _) = negotiate(&mut driver, &GlProfile::Gl2.request(), None).unwrap();

    assert_eq!(handle, 0);
    assert!(driver.tried.is_empty());
    assert!(!negotiated.is_arb_created());
    assert_eq!(negotiated.version, Version(Api::Gl, 1, 1));

    // the real version comes from the driver once bound
    let negotiated = negotiated.with_driver_string(Some("2.1 Mesa 20.0".to_owned()));
    assert_eq!(negotiated.version, Version(Api::Gl, 2, 1));
}

#[test]
fn legacy_creation_refused() {
    let mut driver = Driver::new(|_: &Attempt| true);
    driver.versioned = false;
    driver.legacy = false;

    let err = negotiate(&mut driver, &GlProfile::Gl2.request(), None).unwrap_err();
    assert!(err.attempts.is_empty());
}

#[test]
fn preferred_attempt_first() {
    let preferred = Attempt { major: 3, minor: 2, profile: ProfileFlags::CORE | ProfileFlags::ANY };
    let mut driver = Driver::new(|_: &Attempt| true);

    let (_, negotiated, attempt) = negotiate(&mut driver, &GlProfile::Gl3.request(),
                                             Some(&preferred)).unwrap();

    assert_eq!(driver.tried, vec![preferred]);
    assert_eq!(attempt, preferred);
    assert_eq!(negotiated.version, Version(Api::Gl, 3, 2));
}

#[test]
fn preferred_attempt_refused() {
    let preferred = Attempt { major: 4, minor: 6, profile: ProfileFlags::CORE | ProfileFlags::ANY };
    let mut driver = Driver::new(|a: &Attempt| a.major < 4);

    let (_, _, attempt) = negotiate(&mut driver, &GlProfile::Gl3.request(),
                                    Some(&preferred)).unwrap();

    assert_eq!(driver.tried[0], preferred);
    assert_eq!(driver.tried.len(), 2);
    assert_eq!((attempt.major, attempt.minor), (3, 3));
}

#[test]
fn profile_satisfaction() {
    use glctx::NegotiatedVersion;

    let core_33 = NegotiatedVersion::created(Version(Api::Gl, 3, 3),
                                             ProfileFlags::CORE | ProfileFlags::ARB_CREATED);
    assert!(GlProfile::Gl3.is_satisfied_by(&core_33));
    assert!(!GlProfile::Gl2.is_satisfied_by(&core_33));
    assert!(!GlProfile::Gl3bc.is_satisfied_by(&core_33));
    assert!(!GlProfile::Gl4.is_satisfied_by(&core_33));

    let compat_45 = NegotiatedVersion::created(Version(Api::Gl, 4, 5),
                                               ProfileFlags::COMPAT | ProfileFlags::ARB_CREATED);
    assert!(GlProfile::Gl4bc.is_satisfied_by(&compat_45));
    assert!(GlProfile::Gl4.is_satisfied_by(&compat_45));

    let es = NegotiatedVersion::created(Version(Api::GlEs, 3, 2), ProfileFlags::empty());
    assert!(!GlProfile::Gl2.is_satisfied_by(&es));
}
