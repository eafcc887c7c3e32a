use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Class-id → name mapping for the detection summary. Ids are 1-indexed:
/// line 1 of the file is class 1, id 0 is background and never appears in
/// detections.
#[derive(Debug, Clone, Default)]
pub struct ClassNames {
    names: HashMap<usize, String>,
}

impl ClassNames {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let names: HashMap<usize, String> = reader
            .lines()
            .enumerate()
            .filter_map(|(id, line)| line.ok().map(|name| (id + 1, name.trim().to_string())))
            .collect();

        Ok(Self { names })
    }

    /// Numeric fallback keeps the summary readable without a label file.
    pub fn name(&self, id: usize) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("class {id}"))
    }
}
