//! Package index overrides forwarded into evaluation containers

/// Container pip cache directory used when `SW_PIP_CACHE_DIR` is unset
pub const CNTR_DEFAULT_PIP_CACHE_DIR: &str = "/root/.cache/pip";

const PYPI_INDEX_URL: &str = "SW_PYPI_INDEX_URL";
const PYPI_EXTRA_INDEX_URL: &str = "SW_PYPI_EXTRA_INDEX_URL";
const PYPI_TRUSTED_HOST: &str = "SW_PYPI_TRUSTED_HOST";
const PIP_CACHE_DIR: &str = "SW_PIP_CACHE_DIR";

/// Optional package index settings; absent values are omitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageIndexEnv {
    pub pypi_index_url: Option<String>,
    pub pypi_extra_index_url: Option<String>,
    pub pypi_trusted_host: Option<String>,
    pub pip_cache_dir: Option<String>,
}

impl PackageIndexEnv {
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            pypi_index_url: lookup(PYPI_INDEX_URL),
            pypi_extra_index_url: lookup(PYPI_EXTRA_INDEX_URL),
            pypi_trusted_host: lookup(PYPI_TRUSTED_HOST),
            pip_cache_dir: lookup(PIP_CACHE_DIR),
        }
    }

    /// `NAME=value` pairs for the index variables that are present, in a fixed order
    pub fn env_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (PYPI_INDEX_URL, &self.pypi_index_url),
            (PYPI_EXTRA_INDEX_URL, &self.pypi_extra_index_url),
            (PYPI_TRUSTED_HOST, &self.pypi_trusted_host),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// Pip cache directory inside the container
    pub fn container_pip_cache_dir(&self) -> &str {
        self.pip_cache_dir
            .as_deref()
            .unwrap_or(CNTR_DEFAULT_PIP_CACHE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_present_variables_forwarded() {
        let env = PackageIndexEnv::from_vars(|key| match key {
            "SW_PYPI_INDEX_URL" => Some("https://pypi.internal/simple".to_string()),
            "SW_PYPI_TRUSTED_HOST" => Some("pypi.internal".to_string()),
            _ => None,
        });

        assert_eq!(
            env.env_pairs(),
            vec![
                ("SW_PYPI_INDEX_URL", "https://pypi.internal/simple"),
                ("SW_PYPI_TRUSTED_HOST", "pypi.internal"),
            ]
        );
        assert_eq!(env.container_pip_cache_dir(), CNTR_DEFAULT_PIP_CACHE_DIR);
    }

    #[test]
    fn test_cache_dir_override() {
        let env = PackageIndexEnv {
            pip_cache_dir: Some("/cache/pip".to_string()),
            ..PackageIndexEnv::default()
        };
        assert_eq!(env.container_pip_cache_dir(), "/cache/pip");
        assert!(env.env_pairs().is_empty());
    }
}
