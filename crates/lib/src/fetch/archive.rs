//! Archive extraction with format sniffing.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum UnpackError {
  #[error("failed to unpack '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("'{path}' is not a recognised archive (tar, tar.gz, tar.bz2, tar.xz or zip)")]
  UnknownFormat { path: PathBuf },

  #[error("failed to read zip archive '{path}': {message}")]
  Zip { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
  Tar,
  TarGz,
  TarBz2,
  TarXz,
  Zip,
}

/// Bytes needed to see the `ustar` magic of a plain tar.
const SNIFF_LEN: usize = 512;
const TAR_MAGIC_OFFSET: usize = 257;

impl ArchiveFormat {
  /// Identify an archive from its leading bytes.
  pub fn sniff(header: &[u8]) -> Option<Self> {
    if header.starts_with(&[0x1f, 0x8b]) {
      Some(Self::TarGz)
    } else if header.starts_with(b"BZh") {
      Some(Self::TarBz2)
    } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
      Some(Self::TarXz)
    } else if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
      Some(Self::Zip)
    } else if header.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5) == Some(&b"ustar"[..]) {
      Some(Self::Tar)
    } else {
      None
    }
  }

  /// Read the head of `path` and identify it.
  pub fn detect(path: &Path) -> Result<Option<Self>, io::Error> {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?.take(SNIFF_LEN as u64).read_to_end(&mut header)?;
    Ok(Self::sniff(&header))
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Tar => "tar",
      Self::TarGz => "tar.gz",
      Self::TarBz2 => "tar.bz2",
      Self::TarXz => "tar.xz",
      Self::Zip => "zip",
    }
  }
}

impl fmt::Display for ArchiveFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Unpack an archive into `dest`, keeping its internal layout.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> Result<(), UnpackError> {
  let io_err = |source| UnpackError::Io {
    path: archive_path.to_path_buf(),
    source,
  };

  let format = ArchiveFormat::detect(archive_path)
    .map_err(io_err)?
    .ok_or_else(|| UnpackError::UnknownFormat {
      path: archive_path.to_path_buf(),
    })?;
  debug!(path = %archive_path.display(), %format, "detected archive format");

  fs::create_dir_all(dest).map_err(io_err)?;

  let file = File::open(archive_path).map_err(io_err)?;
  let reader = BufReader::new(file);
  match format {
    ArchiveFormat::Tar => Archive::new(reader).unpack(dest).map_err(io_err)?,
    ArchiveFormat::TarGz => Archive::new(GzDecoder::new(reader)).unpack(dest).map_err(io_err)?,
    ArchiveFormat::TarBz2 => Archive::new(bzip2::read::BzDecoder::new(reader))
      .unpack(dest)
      .map_err(io_err)?,
    ArchiveFormat::TarXz => Archive::new(xz2::read::XzDecoder::new(reader))
      .unpack(dest)
      .map_err(io_err)?,
    ArchiveFormat::Zip => unpack_zip(archive_path, reader, dest)?,
  }

  info!(path = %dest.display(), "unpacked");
  Ok(())
}

fn unpack_zip(archive_path: &Path, reader: BufReader<File>, dest: &Path) -> Result<(), UnpackError> {
  let zip_err = |e: zip::result::ZipError| UnpackError::Zip {
    path: archive_path.to_path_buf(),
    message: e.to_string(),
  };
  let io_err = |source| UnpackError::Io {
    path: archive_path.to_path_buf(),
    source,
  };

  let mut archive = zip::ZipArchive::new(reader).map_err(zip_err)?;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i).map_err(zip_err)?;

    let Some(relative) = file.enclosed_name() else {
      return Err(UnpackError::Zip {
        path: archive_path.to_path_buf(),
        message: format!("entry '{}' escapes the archive root", file.name()),
      });
    };
    let dest_path = dest.join(relative);

    if file.is_dir() {
      fs::create_dir_all(&dest_path).map_err(io_err)?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut outfile = File::create(&dest_path).map_err(io_err)?;
    io::copy(&mut file, &mut outfile).map_err(io_err)?;

    // Keep executable bits so configure scripts stay runnable
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = file.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(io_err)?;
      }
    }
  }

  Ok(())
}
