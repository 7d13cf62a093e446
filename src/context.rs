//! Explicit, caller-supplied configuration — replaces the original's
//! process-wide singletons (SPEC_FULL.md "Configuration"; spec.md §9
//! "Global mutable state").

use std::path::PathBuf;

use crate::hlc::Hlc;

#[derive(Debug, Clone)]
pub struct UnifyContext {
    pub event_store_path: PathBuf,
    pub people_registry_path: PathBuf,
    pub vcf_paths: Vec<PathBuf>,
    pub csv_paths: Vec<PathBuf>,
    pub hlc_node_id: String,
}

impl UnifyContext {
    pub fn new(event_store_path: impl Into<PathBuf>, people_registry_path: impl Into<PathBuf>) -> Self {
        UnifyContext {
            event_store_path: event_store_path.into(),
            people_registry_path: people_registry_path.into(),
            vcf_paths: vec![],
            csv_paths: vec![],
            hlc_node_id: Hlc::random_node_id(),
        }
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.hlc_node_id = node_id.into();
        self
    }

    pub fn with_vcf(mut self, path: impl Into<PathBuf>) -> Self {
        self.vcf_paths.push(path.into());
        self
    }

    pub fn with_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_paths.push(path.into());
        self
    }

    pub fn new_hlc(&self) -> Hlc {
        Hlc::new(self.hlc_node_id.clone())
    }
}
