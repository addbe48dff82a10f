//! Framework configuration is based on [ApplicationConfig], which holds the application-wide
//! settings and the [WebConfig] used to configure servers, action mappings and page rendering.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by values from the `action-web.json` file or environment variables prefixed with `ACTION_WEB`
//! (nested keys separated with `__`, e.g. `ACTION_WEB__WEB__VIEW_ROOT`).
//!
//! Action mappings live under the `web.actions` key as an ordered map of *init params*. Every key
//! starting with `/` is a path prefix under which the controller named by the value is mounted:
//!
//! ```json
//! {
//!   "web": {
//!     "actions": {
//!       "/blog": "my_app::controllers::BlogController",
//!       "/admin/": "admin"
//!     }
//!   }
//! }
//! ```

use config::{Config, ConfigError, Environment, File};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;

const CONFIG_ENV_PREFIX: &str = "ACTION_WEB";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "action-web.json";

/// Server configuration.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    /// Address on which to listen.
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:80".to_string(),
        }
    }
}

/// Ordered init params used to create action mappings. Keys starting with `/` are path prefixes
/// mapped to controller identifiers, while all others are left for other uses.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ActionConfig {
    init_params: IndexMap<String, String>,
}

impl ActionConfig {
    /// Returns all init params in configuration order.
    pub fn init_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.init_params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the init param with given name.
    pub fn init_param(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }

    /// Adds an init param at the end, or replaces the value of an existing one in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.init_params.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.init_params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.init_params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ActionConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            init_params: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Web configuration - servers, action mappings and page rendering.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct WebConfig {
    /// Map from server name to their config. Typically, only one server with one address will be
    /// present, but in case multiple servers are desired, they should be specified here.
    pub servers: FxHashMap<String, ServerConfig>,
    /// Action mappings.
    pub actions: ActionConfig,
    /// Directory containing pages for the default view resolver.
    pub view_root: PathBuf,
    /// Base URL prepended to pages when forwarding, including or redirecting.
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            servers: [("default".to_string(), Default::default())]
                .into_iter()
                .collect(),
            actions: Default::default(),
            view_root: PathBuf::from("views"),
            base_url: "/".to_string(),
        }
    }
}

impl From<OptionalWebConfig> for WebConfig {
    fn from(value: OptionalWebConfig) -> Self {
        let default = Self::default();
        Self {
            servers: value.servers.unwrap_or(default.servers),
            actions: value.actions.unwrap_or(default.actions),
            view_root: value.view_root.unwrap_or(default.view_root),
            base_url: value.base_url.unwrap_or(default.base_url),
        }
    }
}

/// Application-wide configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    pub web: WebConfig,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            web: Default::default(),
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            web: value.web.map(|web| web.into()).unwrap_or(default.web),
        }
    }
}

impl ApplicationConfig {
    /// Loads the configuration from the default config file and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Self::init_from_file(CONFIG_FILE)
    }

    /// Loads the configuration from given file (if it exists) and the environment.
    pub fn init_from_file(name: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX).separator("__"))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalWebConfig {
    servers: Option<FxHashMap<String, ServerConfig>>,
    actions: Option<ActionConfig>,
    view_root: Option<PathBuf>,
    base_url: Option<String>,
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    web: Option<OptionalWebConfig>,
}
