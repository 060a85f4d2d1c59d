use self::Env::*;
use parking_lot::Mutex;
use std::{
    collections::HashSet,
    env, fmt,
    sync::LazyLock,
};

/// Application running environment.
#[non_exhaustive]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Env {
    #[default]
    /// The `dev` environment.
    Dev,
    /// The `prod` environment.
    Prod,
    /// A custom environment.
    Custom(&'static str),
}

impl Env {
    /// Name of the environment variable which selects the running environment.
    pub const VAR_NAME: &'static str = "TOOLSMITH_ENV";

    /// Parses the environment from its name.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "" | "dev" => Dev,
            "prod" => Prod,
            name => Custom(intern(name)),
        }
    }

    /// Reads the environment from the `TOOLSMITH_ENV` variable, defaulting to `dev`.
    pub fn from_env() -> Self {
        env::var(Self::VAR_NAME)
            .map(|name| Self::from_name(&name))
            .unwrap_or_default()
    }

    /// Returns `true` if `self` is the `dev` environment.
    #[inline]
    pub fn is_dev(&self) -> bool {
        matches!(self, Dev)
    }

    /// Returns `true` if `self` is the `prod` environment.
    #[inline]
    pub fn is_prod(&self) -> bool {
        matches!(self, Prod)
    }

    /// Returns `self` as `&'static str`.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Dev => "dev",
            Prod => "prod",
            Custom(name) => name,
        }
    }
}

impl fmt::Display for Env {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns a `'static` copy of a custom environment name, allocating it only
/// the first time the name is seen.
fn intern(name: &str) -> &'static str {
    static NAMES: LazyLock<Mutex<HashSet<&'static str>>> =
        LazyLock::new(|| Mutex::new(HashSet::new()));
    let mut names = NAMES.lock();
    if let Some(interned) = names.get(name) {
        return *interned;
    }
    let interned: &'static str = name.to_owned().leak();
    names.insert(interned);
    interned
}
