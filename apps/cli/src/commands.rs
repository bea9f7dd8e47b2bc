use anyhow::{Context, Result};
use flash_credentials::{inspect_file, open_file, seal_files};
use flash_kernel::config::VaultConfig;
use flash_storage::Storage;
use flash_vault::EnvelopeFormat;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use zeroize::Zeroizing;

/// Splits a container path into a storage root (its directory) and the file name inside it.
pub(crate) fn split_container(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let name = path
        .file_name()
        .with_context(|| format!("Container path has no file name: {}", path.display()))?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, PathBuf::from(name)))
}

async fn connect(root: &Path, create: bool, cfg: &VaultConfig) -> Result<Storage> {
    Storage::builder()
        .root(root)
        .create(create)
        .permissions(cfg.file_mode)
        .connect()
        .await
        .with_context(|| format!("Cannot use container directory {}", root.display()))
}

pub(crate) async fn seal(
    out: &mut impl Write,
    cfg: &VaultConfig,
    cert: &Path,
    macaroon: &Path,
    output: &Path,
    format: EnvelopeFormat,
) -> Result<()> {
    let (root, name) = split_container(output)?;
    let storage = connect(&root, true, cfg).await?;

    let report = seal_files(&storage, cert, macaroon, &name, format).await?;

    info!(
        path = %report.output.display(),
        size = report.container_len,
        "Container written; the key is printed on stdout"
    );
    writeln!(out, "{}", report.key.expose())?;
    Ok(())
}

pub(crate) async fn open(
    out: &mut impl Write,
    cfg: &VaultConfig,
    container: &Path,
    key: Zeroizing<String>,
    format: EnvelopeFormat,
) -> Result<()> {
    let (root, name) = split_container(container)?;
    let storage = connect(&root, false, cfg).await?;

    let credentials = open_file(&storage, &key, &name, format).await?;

    writeln!(out, "certificate: {} bytes", credentials.certificate().len())?;
    writeln!(out, "macaroon: {} bytes", credentials.macaroon().len())?;
    Ok(())
}

pub(crate) async fn inspect(
    out: &mut impl Write,
    cfg: &VaultConfig,
    container: &Path,
) -> Result<()> {
    let (root, name) = split_container(container)?;
    let storage = connect(&root, false, cfg).await?;

    let header = inspect_file(&storage, &name).await?;
    let size = storage.metadata(&name).await?.len();

    writeln!(out, "certificate: {} bytes", header.certificate_len)?;
    writeln!(out, "macaroon: {} bytes", header.macaroon_len)?;
    writeln!(out, "container: {size} bytes")?;
    Ok(())
}

pub(crate) fn keygen(out: &mut impl Write) -> Result<()> {
    let key = flash_vault::generate_key()?;
    writeln!(out, "{}", key.expose())?;
    Ok(())
}
