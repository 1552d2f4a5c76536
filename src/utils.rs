pub(crate) trait PipeMap: tap::Pipe {
    /// Apply `func` only when `option` holds a value.
    fn pipe_map<O>(self, option: Option<O>, func: impl FnOnce(Self, O) -> Self) -> Self
    where
        Self: Sized,
        O: Sized,
    {
        if let Some(inner) = option {
            func(self, inner)
        } else {
            self
        }
    }
}

impl<T: tap::Pipe> PipeMap for T {}

/// Get a systemd credential (see <https://systemd.io/CREDENTIALS/>).
#[cfg(target_os = "linux")]
pub(crate) fn get_credential(name: &str) -> anyhow::Result<secrecy::SecretString> {
    use anyhow::Context;
    use libsystemd::credentials::CredentialsLoader;
    use std::io::{BufReader, Read};

    let loader = CredentialsLoader::open()
        .with_context(|| format!("{name} not given and no systemd credentials available"))?;
    let file = loader.get(name)?;
    let mut buffer = String::new();
    let mut reader = BufReader::new(file);
    reader.read_to_string(&mut buffer)?;
    Ok(buffer.trim_end().to_owned().into())
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn get_credential(name: &str) -> anyhow::Result<secrecy::SecretString> {
    anyhow::bail!("{name} must be given on the command line or in the environment")
}
