//! Stage command - manage the stage index

use crate::cli::args::{StageAction, StageArgs};
use crate::config;
use crate::error::{DudError, DudResult};
use crate::index::Index;
use crate::stage::Stage;
use console::style;
use std::path::{Path, PathBuf};

/// Execute the stage command
pub async fn execute(args: StageArgs) -> DudResult<()> {
    match args.action {
        StageAction::Add { files } => add(files),
    }
}

/// Validate stage files and register them in the index
fn add(files: Vec<PathBuf>) -> DudResult<()> {
    let root = config::find_root()?;
    let mut index = Index::load(&root)?;

    for file in files {
        let stage_path = relativize(&root, &file)?;
        let stage = Stage::from_file(&root.join(&stage_path))?;
        index.add_stage(stage_path.clone(), stage)?;
        println!("{} Added stage {}", style("✓").green(), stage_path);
    }

    index.save(&root)
}

/// Express a stage file path relative to the workspace root
fn relativize(root: &Path, file: &Path) -> DudResult<String> {
    let invalid = |reason: String| DudError::StageInvalid {
        path: file.to_path_buf(),
        reason,
    };

    let absolute = file
        .canonicalize()
        .map_err(|e| invalid(e.to_string()))?;
    let root = root
        .canonicalize()
        .map_err(|e| DudError::io(format!("resolving workspace root {}", root.display()), e))?;

    let relative = absolute
        .strip_prefix(&root)
        .map_err(|_| invalid("stage file is outside the workspace".to_string()))?;
    relative
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| invalid("stage path is not valid UTF-8".to_string()))
}
