//! Static facts about the host: operating system, distribution release and
//! the invoking user.
//!
//! Gathered once at startup into an immutable [`Platform`] that is passed to
//! every component needing it.
use std::fmt;
use std::path::{Path, PathBuf};

use nix::unistd::User;

use crate::error::PlatformError;

/// Release-identification files, in lookup order.
const OS_RELEASE_FILES: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux, the only supported target.
    Linux,
    /// Anything else.
    Other,
}

impl Os {
    /// The operating system this binary was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "{}", std::env::consts::OS),
        }
    }
}

/// Distribution identification, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// Distribution id (`ubuntu`, `debian`, ...).
    pub id: String,
    /// Distribution version (`22.04`, `12`, ...).
    pub version: String,
    /// Release codename (`jammy`, `bookworm`, ...).
    pub codename: String,
}

impl OsRelease {
    /// Parse the `KEY=VALUE` format of `os-release(5)`.
    ///
    /// The codename comes from `VERSION_CODENAME`, falling back to
    /// `UBUNTU_CODENAME`.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut id = String::new();
        let mut version = String::new();
        let mut codename = String::new();
        let mut ubuntu_codename = String::new();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_lowercase();
            match key.trim() {
                "ID" => id = value,
                "VERSION_ID" => version = value,
                "VERSION_CODENAME" => codename = value,
                "UBUNTU_CODENAME" => ubuntu_codename = value,
                _ => {}
            }
        }

        if codename.is_empty() {
            codename = ubuntu_codename;
        }
        Self {
            id,
            version,
            codename,
        }
    }

    fn read() -> Result<Self, PlatformError> {
        OS_RELEASE_FILES
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .map(|content| Self::parse(&content))
            .ok_or_else(|| {
                PlatformError::DetectionFailed(format!(
                    "no release file found (looked in {})",
                    OS_RELEASE_FILES.join(", ")
                ))
            })
    }
}

/// The user on whose behalf the run happens (the `sudo` caller, not root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// Login name.
    pub name: String,
    /// User id.
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// Home directory from the passwd entry.
    pub home: PathBuf,
}

impl UserInfo {
    /// Look up `name` in the passwd database, falling back to `/home/<name>`
    /// and the given ids when the entry is missing.
    fn lookup(name: &str, fallback_uid: u32) -> Self {
        match User::from_name(name) {
            Ok(Some(user)) => Self {
                name: user.name,
                uid: user.uid.as_raw(),
                gid: user.gid.as_raw(),
                home: user.dir,
            },
            _ => Self {
                name: name.to_string(),
                uid: fallback_uid,
                gid: fallback_uid,
                home: Path::new("/home").join(name),
            },
        }
    }
}

/// Platform information for the current run.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// Distribution identification.
    pub release: OsRelease,
    /// Invoking (non-privileged) user.
    pub user: UserInfo,
    /// Effective uid of this process.
    pub effective_uid: u32,
}

impl Platform {
    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(os: Os, release: OsRelease, user: UserInfo, effective_uid: u32) -> Self {
        Self {
            os,
            release,
            user,
            effective_uid,
        }
    }

    /// Detect the current platform.
    ///
    /// When running as root, the invoking user is taken from `SUDO_USER`;
    /// otherwise it is the owner of the real uid.
    ///
    /// # Errors
    ///
    /// Returns an error if the release file is missing or the current user
    /// has no passwd entry.
    pub fn detect() -> Result<Self, PlatformError> {
        let os = Os::current();
        let release = OsRelease::read()?;

        let euid = nix::unistd::geteuid();
        let uid = nix::unistd::getuid();

        let sudo_user = std::env::var("SUDO_USER")
            .ok()
            .filter(|u| euid.is_root() && !u.is_empty());
        let user = match sudo_user {
            Some(name) => UserInfo::lookup(&name, uid.as_raw()),
            None => {
                let name = User::from_uid(uid)
                    .ok()
                    .flatten()
                    .map(|u| u.name)
                    .ok_or_else(|| {
                        PlatformError::DetectionFailed(format!("no passwd entry for uid {uid}"))
                    })?;
                UserInfo::lookup(&name, uid.as_raw())
            }
        };

        Ok(Self::new(os, release, user, euid.as_raw()))
    }

    /// `true` on Linux.
    #[must_use]
    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// `true` when the process runs with effective uid 0.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.effective_uid == 0
    }

    /// `true` when commands for the invoking user must drop privileges.
    #[must_use]
    pub fn runs_as_other_user(&self) -> bool {
        self.user.uid != self.effective_uid
    }

    /// Check the process requirements: root privileges on Linux.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotRoot`] or [`PlatformError::Unsupported`].
    pub fn ensure_supported(&self) -> Result<(), PlatformError> {
        check_process(self.os, self.effective_uid)
    }
}

/// Check the current process before anything is read from or written to
/// disk: root privileges on Linux.
///
/// # Errors
///
/// Returns [`PlatformError::NotRoot`] or [`PlatformError::Unsupported`].
pub fn ensure_process_supported() -> Result<(), PlatformError> {
    check_process(Os::current(), nix::unistd::geteuid().as_raw())
}

fn check_process(os: Os, effective_uid: u32) -> Result<(), PlatformError> {
    if effective_uid != 0 {
        return Err(PlatformError::NotRoot);
    }
    if os != Os::Linux {
        return Err(PlatformError::Unsupported { os: os.to_string() });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn platform(effective_uid: u32, user_uid: u32) -> Platform {
        Platform::new(
            Os::Linux,
            OsRelease {
                id: "ubuntu".into(),
                version: "22.04".into(),
                codename: "jammy".into(),
            },
            UserInfo {
                name: "dev".into(),
                uid: user_uid,
                gid: user_uid,
                home: PathBuf::from("/home/dev"),
            },
            effective_uid,
        )
    }

    #[test]
    fn parse_ubuntu_os_release() {
        let content = r#"NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
VERSION_CODENAME=jammy
UBUNTU_CODENAME=jammy
"#;
        let release = OsRelease::parse(content);
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.version, "22.04");
        assert_eq!(release.codename, "jammy");
    }

    #[test]
    fn parse_falls_back_to_ubuntu_codename() {
        let release = OsRelease::parse("ID=Pop\nVERSION_ID=\"22.04\"\nUBUNTU_CODENAME=Jammy\n");
        assert_eq!(release.id, "pop");
        assert_eq!(release.codename, "jammy");
    }

    #[test]
    fn parse_ignores_comments_and_garbage() {
        let release = OsRelease::parse("# comment\n\nnot a pair\nID=debian\n");
        assert_eq!(release.id, "debian");
        assert!(release.version.is_empty());
    }

    #[test]
    fn ensure_supported_requires_root() {
        let p = platform(1000, 1000);
        assert!(matches!(p.ensure_supported(), Err(PlatformError::NotRoot)));
        assert!(platform(0, 1000).ensure_supported().is_ok());
    }

    #[test]
    fn ensure_supported_rejects_other_os() {
        let mut p = platform(0, 1000);
        p.os = Os::Other;
        assert!(matches!(
            p.ensure_supported(),
            Err(PlatformError::Unsupported { .. })
        ));
    }

    #[test]
    fn missing_privileges_reported_before_unsupported_os() {
        assert!(matches!(
            check_process(Os::Other, 1000),
            Err(PlatformError::NotRoot)
        ));
        assert!(check_process(Os::Linux, 0).is_ok());
    }

    #[test]
    fn process_check_needs_no_release_file() {
        let result = ensure_process_supported();
        if nix::unistd::geteuid().is_root() {
            assert!(!matches!(result, Err(PlatformError::NotRoot)));
        } else {
            assert!(matches!(result, Err(PlatformError::NotRoot)));
        }
    }

    #[test]
    fn runs_as_other_user_when_uids_differ() {
        assert!(platform(0, 1000).runs_as_other_user());
        assert!(!platform(1000, 1000).runs_as_other_user());
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::Linux.to_string(), "linux");
    }
}
