use std::path::PathBuf;

/// Runtime configuration assembled from CLI arguments and environment in
/// `main`; read-only for the rest of the process. The command prefix and the
/// admin list live in the state document once seeded (they are mutable at
/// runtime via admin commands).
#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) api_url: String,
    pub(crate) account: String,
    pub(crate) data_dir: PathBuf,
    pub(crate) admins: Vec<String>,
    pub(crate) prefix: Option<String>,
}

impl Config {
    pub(crate) fn store_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    pub(crate) fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}
