//! Template scaffolding for new tenants

use anyhow::{Context, Result};
use sitemux_proto::{TenantSlug, DEFAULT_ROOT};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Copy the shared template tree into a tenant's own root
///
/// Existing files in the tenant root are kept. Returns the number of files copied.
pub fn copy_default_templates(base_dir: &Path, slug: &TenantSlug) -> Result<usize> {
    let source = base_dir.join(DEFAULT_ROOT);
    let target = base_dir.join(slug.as_str());

    if !source.is_dir() {
        anyhow::bail!("Shared template root not found: {:?}", source);
    }

    let copied = copy_tree(&source, &target)?;
    info!("Copied {} template(s) into {:?}", copied, target);
    Ok(copied)
}

fn copy_tree(source: &Path, target: &Path) -> Result<usize> {
    fs::create_dir_all(target)
        .with_context(|| format!("Failed to create directory: {:?}", target))?;

    let mut copied = 0;
    for entry in
        fs::read_dir(source).with_context(|| format!("Failed to read directory: {:?}", source))?
    {
        let entry = entry?;
        let from = entry.path();
        let to = target.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else if to.exists() {
            debug!("Keeping existing template {:?}", to);
        } else {
            fs::copy(&from, &to).with_context(|| format!("Failed to copy {:?}", from))?;
            copied += 1;
        }
    }

    Ok(copied)
}
