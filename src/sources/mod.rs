//! Built-in `Source` implementations matching the declaration format's
//! standard types (§4.10): `env`, `system`, `classpath`, `file`.

mod classpath;
mod env;
mod file;
mod system_property;

pub use classpath::ClasspathSource;
pub use env::EnvSource;
pub use file::FileSource;
pub use system_property::SystemPropertySource;
