use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Where working clones live unless configured otherwise.
pub(crate) fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("io", "cherrypicker", "cherrypicker").map(|d| d.cache_dir().to_path_buf())
}

/// Open the clone at `path`, cloning it from `url` first if it does not exist,
/// and fetch every upstream branch into `refs/remotes/origin/*`.
pub(crate) fn sync_repo(url: &str, path: &Path) -> Result<git2::Repository, git2::Error> {
    let repo = if path.join(".git").is_dir() {
        git2::Repository::open(path)?
    } else {
        tracing::info!("Cloning {url} into {}", path.display());
        git2::build::RepoBuilder::new().clone(url, path)?
    };
    {
        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&["+refs/heads/*:refs/remotes/origin/*"], None, None)?;
    }
    Ok(repo)
}
