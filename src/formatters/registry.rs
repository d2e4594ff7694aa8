use anyhow::{Result, bail};
use std::ffi::OsString;
use std::path::Path;

use crate::config::FormatterConfig;

/// Placeholder replaced by the target file's path in formatter arguments
pub const FILE_PLACEHOLDER: &str = "{file}";

/// A resolved external formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSpec {
    pub name: String,
    pub extensions: Vec<String>,
    pub command: String,
    pub args: Vec<String>,
}

impl FormatterSpec {
    pub fn new(name: &str, extensions: &[&str], command: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn handles(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        self.extensions.iter().any(|e| *e == extension)
    }

    /// Arguments for formatting `file`. The path replaces every `{file}`
    /// placeholder, or is appended when there is none.
    pub fn command_args(&self, file: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        let mut substituted = false;

        for arg in &self.args {
            if arg == FILE_PLACEHOLDER {
                args.push(file.as_os_str().to_os_string());
                substituted = true;
            } else if arg.contains(FILE_PLACEHOLDER) {
                let file = file.to_string_lossy();
                args.push(arg.replace(FILE_PLACEHOLDER, &file).into());
                substituted = true;
            } else {
                args.push(arg.into());
            }
        }

        if !substituted {
            args.push(file.as_os_str().to_os_string());
        }
        args
    }
}

/// Lowercase and strip a leading dot: `.CPP` and `cpp` name the same extension
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(normalize_extension)
}

/// Formatters available without any configuration
pub fn builtin_formatters() -> Vec<FormatterSpec> {
    vec![
        FormatterSpec::new(
            "clang-format",
            &["c", "h", "cc", "cpp", "cxx", "hpp", "hh", "hxx"],
            "clang-format",
            &["-i"],
        ),
        FormatterSpec::new("rustfmt", &["rs"], "rustfmt", &[]),
        FormatterSpec::new("gofmt", &["go"], "gofmt", &["-w"]),
        FormatterSpec::new("black", &["py"], "black", &["-q"]),
        FormatterSpec::new("shfmt", &["sh", "bash"], "shfmt", &["-w"]),
    ]
}

pub fn is_builtin(name: &str) -> bool {
    builtin_formatters().iter().any(|spec| spec.name == name)
}

/// Extension to formatter lookup
#[derive(Debug, Clone)]
pub struct FormatterRegistry {
    formatters: Vec<FormatterSpec>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FormatterRegistry {
    pub fn builtin() -> Self {
        Self {
            formatters: builtin_formatters(),
        }
    }

    /// Layer configured formatters over the built-in ones.
    ///
    /// Formatters defined only in configuration take precedence over built-ins
    /// when both claim an extension. Unset fields of an override fall back to
    /// the built-in formatter of the same name.
    pub fn from_config<'a>(
        configured: impl IntoIterator<Item = (&'a String, &'a FormatterConfig)>,
    ) -> Result<Self> {
        let mut builtins = builtin_formatters();
        let mut custom = Vec::new();

        for (name, config) in configured {
            let position = builtins.iter().position(|spec| spec.name == *name);

            if config.enabled == Some(false) {
                if let Some(index) = position {
                    builtins.remove(index);
                }
                continue;
            }

            match position {
                Some(index) => {
                    let spec = &mut builtins[index];
                    if let Some(command) = config.command.as_ref().filter(|c| !c.is_empty()) {
                        spec.command = command.clone();
                    }
                    if let Some(args) = &config.args {
                        spec.args = args.clone();
                    }
                    if let Some(extensions) =
                        config.extensions.as_ref().filter(|e| !e.is_empty())
                    {
                        spec.extensions =
                            extensions.iter().map(|e| normalize_extension(e)).collect();
                    }
                }
                None => {
                    let Some(command) = config.command.as_ref().filter(|c| !c.is_empty()) else {
                        bail!("Formatter '{}' has no command", name);
                    };
                    let extensions = match &config.extensions {
                        Some(extensions) if !extensions.is_empty() => extensions,
                        _ => bail!("Formatter '{}' has no file extensions", name),
                    };
                    custom.push(FormatterSpec {
                        name: name.clone(),
                        extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
                        command: command.clone(),
                        args: config.args.clone().unwrap_or_default(),
                    });
                }
            }
        }

        custom.sort_by(|a, b| a.name.cmp(&b.name));
        custom.extend(builtins);
        Ok(Self { formatters: custom })
    }

    pub fn formatter_for(&self, path: &Path) -> Option<&FormatterSpec> {
        let extension = extension_of(path)?;
        self.formatters.iter().find(|spec| spec.handles(&extension))
    }

    pub fn get(&self, name: &str) -> Option<&FormatterSpec> {
        self.formatters.iter().find(|spec| spec.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatterSpec> {
        self.formatters.iter()
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}
