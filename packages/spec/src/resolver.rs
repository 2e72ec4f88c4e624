//! Property key resolution.

use crate::MethodDescriptor;

/// The store key a property method reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: String,
    /// Whether the method is semantically a setter.
    pub is_setter: bool,
}

/// Maps a method descriptor to its store key.
///
/// Implementations must be deterministic: a spec type resolves every key once
/// when it is built and never asks again.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, method: &MethodDescriptor) -> Resolution;
}

/// How a name-derived key is spelled in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// Keep the method's snake_case name.
    #[default]
    Snake,
    /// `max_players` becomes `max-players`.
    Kebab,
    /// `max_players` becomes `maxPlayers`.
    Camel,
}

impl KeyStyle {
    fn apply(self, name: &str) -> String {
        match self {
            KeyStyle::Snake => name.to_string(),
            KeyStyle::Kebab => name.replace('_', "-"),
            KeyStyle::Camel => {
                let mut out = String::with_capacity(name.len());
                let mut upper = false;
                for c in name.chars() {
                    if c == '_' {
                        upper = !out.is_empty();
                    } else if upper {
                        out.extend(c.to_uppercase());
                        upper = false;
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}

const GETTER_PREFIXES: [&str; 2] = ["get_", "is_"];
const SETTER_PREFIX: &str = "set_";

/// The default resolver, driven by Rust method naming.
///
/// - an explicit key on the descriptor wins
/// - `get_`, `is_` and `set_` prefixes are stripped
/// - a method is a setter iff it is named `set_*` and takes one argument
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingConvention {
    style: KeyStyle,
}

impl NamingConvention {
    pub fn new(style: KeyStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> KeyStyle {
        self.style
    }
}

impl KeyResolver for NamingConvention {
    fn resolve(&self, method: &MethodDescriptor) -> Resolution {
        let name = method.name();
        let is_setter =
            method.arity() == 1 && name.len() > SETTER_PREFIX.len() && name.starts_with(SETTER_PREFIX);

        let key = match method.explicit_key() {
            Some(key) => key.to_string(),
            None => {
                let bare = std::iter::once(SETTER_PREFIX)
                    .chain(GETTER_PREFIXES)
                    .find_map(|prefix| name.strip_prefix(prefix).filter(|rest| !rest.is_empty()))
                    .unwrap_or(name);
                self.style.apply(bare)
            }
        };

        Resolution { key, is_setter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Returns;

    fn resolve(name: &str, arity: usize) -> Resolution {
        NamingConvention::default().resolve(&MethodDescriptor::new(name, arity, Returns::Value))
    }

    #[test]
    fn strips_accessor_prefixes() {
        assert_eq!(resolve("get_port", 0).key, "port");
        assert_eq!(resolve("is_enabled", 0).key, "enabled");
        assert_eq!(resolve("set_port", 1).key, "port");
        assert_eq!(resolve("port", 0).key, "port");
    }

    #[test]
    fn setter_needs_prefix_and_one_argument() {
        assert!(resolve("set_port", 1).is_setter);
        assert!(!resolve("set_port", 0).is_setter);
        assert!(!resolve("port", 1).is_setter);
    }

    #[test]
    fn bare_prefix_is_kept_as_name() {
        assert_eq!(resolve("get_", 0).key, "get_");
    }

    #[test]
    fn explicit_key_wins() {
        let method = MethodDescriptor::getter("get_port").key("listen.port");
        assert_eq!(
            NamingConvention::new(KeyStyle::Kebab).resolve(&method).key,
            "listen.port"
        );
    }

    #[test]
    fn key_styles() {
        let method = MethodDescriptor::getter("get_max_players");
        assert_eq!(
            NamingConvention::new(KeyStyle::Snake).resolve(&method).key,
            "max_players"
        );
        assert_eq!(
            NamingConvention::new(KeyStyle::Kebab).resolve(&method).key,
            "max-players"
        );
        assert_eq!(
            NamingConvention::new(KeyStyle::Camel).resolve(&method).key,
            "maxPlayers"
        );
    }
}
