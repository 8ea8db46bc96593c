//! Extractor registry

use std::sync::Arc;

use super::{CommandExtractor, Extractor};
use crate::config::Config;

/// Ordered, immutable list of extractors run against every capture
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// Build the subprocess registry described by `EXTRACTORS`
    pub fn from_config(config: &Config) -> Self {
        let extractors = config
            .extractor_specs()
            .into_iter()
            .map(|spec| {
                let script = config.script_path(&spec.script);
                if !script.exists() {
                    tracing::warn!(
                        "Extractor '{}' script {} not found; it will fail on every upload",
                        spec.name,
                        script.display()
                    );
                }
                Arc::new(CommandExtractor::script(
                    spec.name,
                    config.extractor_interpreter.clone(),
                    script,
                )) as Arc<dyn Extractor>
            })
            .collect();

        Self::new(extractors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extractor>> {
        self.extractors.iter()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.extractors.iter().map(|e| e.name().to_string()).collect()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.extractors.iter().map(|e| e.name())).finish()
    }
}
