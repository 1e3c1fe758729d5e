use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub project: String,
    pub subj: String,
    pub sess: String,
    pub task: String,
    pub model: String,
    pub contrast: String,
    pub mask: String,
    pub mask_sig: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outputs {
    pub tsv_path: Option<String>,
}

/// Versioned run report written beside the TSV artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotProdV1 {
    pub tool: String,
    pub version: String,
    pub schema_version: String,
    pub run_meta: RunMeta,
    pub emotions: Vec<String>,
    pub n_vols: Option<u64>,
    pub label_counts: Vec<LabelCount>,
    pub outputs: Outputs,
}

impl DotProdV1 {
    pub fn empty(tool_version: &str, run_meta: RunMeta, emotions: Vec<String>) -> Self {
        Self {
            tool: "restdot".to_string(),
            version: tool_version.to_string(),
            schema_version: "v1".to_string(),
            run_meta,
            emotions,
            n_vols: None,
            label_counts: Vec::new(),
            outputs: Outputs { tsv_path: None },
        }
    }
}
