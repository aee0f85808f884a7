use std::fs::File;
use std::io::Read;
use std::path::Path;

quick_error! {
    #[derive(Debug)]
    pub enum ConfigError {
        Io(err: std::io::Error) {
            source(err)
            display("can't read guard config: {}", err)
            from()
        }
        FromToml(err: toml::de::Error) {
            source(err)
            display("invalid guard config: {}", err)
            from()
        }
    }
}

/// Registry-specific knobs. Every field has a default, so an empty file
/// (or no file at all) yields the stock npm registry rules.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The registry's own bootstrap package, which can never be deleted.
    pub reserved_name: String,
    pub max_name_length: usize,
    /// Ceiling for each of `dependencies`, `devDependencies` and
    /// `optionalDependencies`, counted separately.
    pub max_dependencies: usize,
    pub admin_role: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            reserved_name: "npm".to_string(),
            max_name_length: 511,
            max_dependencies: 1000,
            admin_role: "_admin".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_str(data: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    pub fn from_reader<R: Read>(r: &mut R) -> Result<Config, ConfigError> {
        let mut data = String::new();
        r.read_to_string(&mut data)?;
        Config::from_toml_str(&data)
    }

    /// A missing file is not an error: the defaults apply.
    pub fn read(path: &Path) -> Result<Config, ConfigError> {
        match File::open(path) {
            Err(ref err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
            Ok(mut file) => Config::from_reader(&mut file),
        }
    }
}
