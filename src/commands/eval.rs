//! Eval command

use std::path::{Path, PathBuf};

use console::style;
use mlbox::error::Result;
use mlbox::job::{
    DirectoryExtractor, DirectoryRuntime, JobBackends, JobExecutor, JobOptions,
    ProcessEvalHandler, ProcessRunner, RuntimeStore,
};
use mlbox::manifest::{TaskKind, check_path_component};

use crate::cli::EvalArgs;

/// A reference naming an existing directory, or one under `base`
fn resolve_dir(base: &Path, reference: &str) -> PathBuf {
    let direct = Path::new(reference);
    if direct.is_dir() {
        direct.to_path_buf()
    } else {
        base.join(reference)
    }
}

/// Run eval command
pub fn run(root: Option<&Path>, args: EvalArgs) -> Result<()> {
    let cfg = super::load_config(root)?;
    let kind: TaskKind = args.task_type.parse()?;
    check_path_component("project", &args.project)?;
    let project_dir = cfg.project_dir(&args.project);

    let runtime = args.runtime.as_deref().map(|reference| {
        Box::new(DirectoryRuntime::new(resolve_dir(&project_dir, reference)))
            as Box<dyn RuntimeStore>
    });
    let backends = JobBackends {
        extractor: Box::new(DirectoryExtractor::new(&project_dir)),
        runtime,
        handler: Box::new(ProcessEvalHandler::new(&args.handler)),
        runner: Box::new(ProcessRunner),
    };

    let options = JobOptions {
        project: args.project.clone(),
        project_dir,
        model_ref: args.model.clone(),
        dataset_refs: args.datasets.clone(),
        runtime_ref: args.runtime.clone(),
        version: args.job_version.clone(),
        name: args.name.clone(),
        description: args.desc.clone(),
        gencmd: args.gencmd,
        use_container: args.use_docker,
        show_progress: super::show_progress(args.no_progress),
    };

    let mut executor = JobExecutor::new(cfg, options, backends)?;
    let version = executor.run(kind, &args.step, args.task_index)?;

    if args.gencmd {
        if let Some(command) = executor.last_command() {
            println!("{}", style(format!("{} container command", kind)).bold());
            println!("{}", command.shell_line());
        }
    }

    println!(
        "{} {} ({})",
        style("Evaluation").green().bold(),
        version,
        executor.manifest().status
    );
    println!("  {} {}", style("workdir").dim(), executor.workdir().display());
    Ok(())
}
