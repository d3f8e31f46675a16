//! `${name}` substitution in the raw configuration text.
use crate::platform::Platform;

/// Values for the known macro tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroValues {
    /// `${distr_name}`: distribution id.
    pub distr_name: String,
    /// `${distr_ver}`: distribution version.
    pub distr_ver: String,
    /// `${user}`: invoking user name.
    pub user: String,
    /// `${home}`: invoking user's home directory.
    pub home: String,
}

impl MacroValues {
    /// Values for the current platform and invoking user.
    #[must_use]
    pub fn from_platform(platform: &Platform) -> Self {
        Self {
            distr_name: platform.release.id.clone(),
            distr_ver: platform.release.version.clone(),
            user: platform.user.name.clone(),
            home: platform.user.home.display().to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "distr_name" => Some(self.distr_name.as_str()),
            "distr_ver" => Some(self.distr_ver.as_str()),
            "user" => Some(self.user.as_str()),
            "home" => Some(self.home.as_str()),
            _ => None,
        }
    }
}

/// Replace every known `${name}` token in `text`.
///
/// Unknown tokens and unterminated `${` are left exactly as written.
#[must_use]
pub fn expand(text: &str, values: &MacroValues) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((before, after)) = rest.split_once("${") {
        out.push_str(before);
        let Some((name, tail)) = after.split_once('}') else {
            out.push_str("${");
            out.push_str(after);
            return out;
        };
        match values.lookup(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}
