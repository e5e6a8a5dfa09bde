//! Upload and download commands

use std::path::{Path, PathBuf};

use console::style;
use mlbox::config::DATASET_DIR;
use mlbox::error::{Result, config};
use mlbox::manifest::check_path_component;
use mlbox::sync::{BundleSyncEngine, FsTransport, SyncReport, SyncRequest};
use mlbox::tabular::DirRowStore;

use crate::cli::SyncArgs;

/// Datastore directory inside a remote store
const REMOTE_DATASTORE_DIR: &str = ".datastore";

/// Split `<name>/<version>`
fn parse_bundle(bundle: &str) -> Result<(&str, &str)> {
    match bundle.split_once('/') {
        Some((name, version))
            if !name.is_empty() && !version.is_empty() && !version.contains('/') =>
        {
            Ok((name, version))
        }
        _ => Err(config::invalid(format!(
            "bundle '{}' is not of the form <name>/<version>",
            bundle
        ))),
    }
}

fn sync_request(args: &SyncArgs) -> Result<SyncRequest> {
    let (name, version) = parse_bundle(&args.bundle)?;
    let remote_project = args
        .remote_project
        .clone()
        .unwrap_or_else(|| args.project.clone());

    check_path_component("bundle name", name)?;
    check_path_component("bundle version", version)?;
    check_path_component("project", &args.project)?;
    check_path_component("remote project", &remote_project)?;

    Ok(SyncRequest {
        name: name.to_string(),
        version: version.to_string(),
        local_project: args.project.clone(),
        remote_project,
        remote_instance: args
            .remote_instance
            .clone()
            .unwrap_or_else(|| args.remote.display().to_string()),
    })
}

fn engine(
    datastore_dir: PathBuf,
    layout: mlbox::content::StoreLayout,
    args: &SyncArgs,
) -> BundleSyncEngine<DirRowStore, FsTransport> {
    let rows = DirRowStore::new(datastore_dir).with_remote(args.remote.join(REMOTE_DATASTORE_DIR));
    let transport =
        FsTransport::new(&args.remote).with_progress(super::show_progress(args.no_progress));
    BundleSyncEngine::new(layout, rows, transport)
}

/// Run upload command
pub fn upload(root: Option<&Path>, args: SyncArgs) -> Result<()> {
    let cfg = super::load_config(root)?;
    let request = sync_request(&args)?;
    let workdir = cfg.dataset_workdir(&request.local_project, &request.name, &request.version);

    tracing::info!("uploading {} from {}", request.local_bundle(), workdir.display());
    let mut engine = engine(cfg.datastore_dir.clone(), cfg.store_layout(), &args);
    let report = engine.upload(&request, &workdir)?;

    print_report("Uploaded", &request, &report);
    Ok(())
}

/// Run download command
pub fn download(root: Option<&Path>, args: SyncArgs) -> Result<()> {
    let cfg = super::load_config(root)?;
    let request = sync_request(&args)?;
    let workdir = cfg.dataset_workdir(&request.local_project, &request.name, &request.version);

    tracing::info!("downloading {} into {}", request.remote_bundle(), workdir.display());
    let mut engine = engine(cfg.datastore_dir.clone(), cfg.store_layout(), &args);
    let report = engine.download(&request, &workdir)?;

    print_report("Downloaded", &request, &report);
    println!("  {} {}", style("into").dim(), workdir.display());
    Ok(())
}

fn print_report(verb: &str, request: &SyncRequest, report: &SyncReport) {
    println!(
        "{} {}/{}/{}/{}",
        style(verb).green().bold(),
        request.local_project,
        DATASET_DIR,
        request.name,
        request.version
    );
    println!(
        "  {} rows, {} files ({} bytes), {} already present",
        report.rows, report.transfer.files, report.transfer.bytes, report.transfer.skipped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlbox::error::MlboxError;

    #[test]
    fn test_parse_bundle() {
        assert_eq!(parse_bundle("mnist/v1").unwrap(), ("mnist", "v1"));
        for bad in ["mnist", "mnist/", "/v1", "a/b/c"] {
            let err = parse_bundle(bad).unwrap_err();
            assert!(matches!(err, MlboxError::ConfigInvalid { .. }), "{bad}");
        }
    }

    fn args(bundle: &str, project: &str) -> SyncArgs {
        SyncArgs {
            bundle: bundle.to_string(),
            remote: PathBuf::from("/mnt/shared"),
            project: project.to_string(),
            remote_project: None,
            remote_instance: None,
            no_progress: true,
        }
    }

    #[test]
    fn test_request_rejects_path_escapes() {
        for (bundle, project) in [("../v1", "self"), ("mnist/..", "self"), ("mnist/v1", "..")] {
            let err = sync_request(&args(bundle, project)).unwrap_err();
            assert!(
                matches!(err, MlboxError::ConfigInvalid { .. }),
                "{bundle} in {project}"
            );
        }

        let mut remote = args("mnist/v1", "self");
        remote.remote_project = Some("team/../..".to_string());
        assert!(sync_request(&remote).is_err());
    }

    #[test]
    fn test_remote_defaults() {
        let args = SyncArgs {
            bundle: "mnist/v1".to_string(),
            remote: PathBuf::from("/mnt/shared"),
            project: "team".to_string(),
            remote_project: None,
            remote_instance: None,
            no_progress: true,
        };
        let request = sync_request(&args).unwrap();
        assert_eq!(request.remote_project, "team");
        assert_eq!(request.remote_instance, "/mnt/shared");
    }
}
