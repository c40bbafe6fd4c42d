//! Command handlers: load the family a command names, run it, report.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::collection::snapshot_file_name;
use crate::application::{import_file, Collection, FamilySnapshot};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::display::{Label, TreeDisplay};
use crate::domain::{
    FamilyKind, Geography, GeologicTimePeriod, LithoStrat, NodeId, Storage, Taxon, TreeFamily,
};
use crate::tree::Tree;

/// Run `$body` with `$f` bound to the marker type of `$kind`.
macro_rules! with_family {
    ($kind:expr, $f:ident => $body:expr) => {
        match $kind {
            FamilyKind::Geography => {
                type $f = Geography;
                $body
            }
            FamilyKind::GeologicTimePeriod => {
                type $f = GeologicTimePeriod;
                $body
            }
            FamilyKind::LithoStrat => {
                type $f = LithoStrat;
                $body
            }
            FamilyKind::Storage => {
                type $f = Storage;
                $body
            }
            FamilyKind::Taxon => {
                type $f = Taxon;
                $body
            }
        }
    };
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.dir {
        settings.snapshot_dir = dir.clone();
    }
    debug!("settings: {:?}", settings);

    match &cli.command {
        Some(Commands::Show {
            family,
            full_names,
            numbers,
        }) => {
            let label = match (full_names, numbers) {
                (true, _) => Label::FullName,
                (_, true) => Label::Numbered,
                _ => Label::Name,
            };
            with_family!(family, F => show::<F>(&settings, label))
        }
        Some(Commands::Verify) => verify(&settings),
        Some(Commands::Rebuild { family, output }) => {
            with_family!(family, F => rebuild::<F>(&settings, output.as_deref()))
        }
        Some(Commands::Import { family, records }) => {
            with_family!(family, F => import::<F>(&settings, records))
        }
        Some(Commands::FullName { family, id }) => {
            with_family!(family, F => full_name::<F>(&settings, NodeId(*id)))
        }
        Some(Commands::Resolve { family, id }) => {
            with_family!(family, F => resolve::<F>(&settings, NodeId(*id)))
        }
        Some(Commands::Descendants { family, id }) => {
            with_family!(family, F => descendants::<F>(&settings, NodeId(*id)))
        }
        Some(Commands::Config { command }) => config(&settings, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `ranktree --help`".to_string(),
        )),
    }
}

fn snapshot_path(settings: &Settings, kind: FamilyKind) -> PathBuf {
    settings.resolve_snapshot(Path::new(&snapshot_file_name(kind)))
}

fn load<F: TreeFamily>(settings: &Settings) -> CliResult<Tree<F>> {
    let path = snapshot_path(settings, F::KIND);
    if !path.exists() {
        return Err(CliError::Usage(format!(
            "no {} snapshot at {}",
            F::NAME,
            path.display()
        )));
    }
    Ok(FamilySnapshot::load(&path)?.restore::<F>(settings)?)
}

#[instrument(level = "debug", skip(settings))]
fn show<F: TreeFamily>(settings: &Settings, label: Label) -> CliResult<()> {
    let tree = load::<F>(settings)?;
    output::info(&tree.to_term_tree(label));
    Ok(())
}

#[instrument(level = "debug", skip(settings))]
fn verify(settings: &Settings) -> CliResult<()> {
    let collection = Collection::load_dir(&settings.snapshot_dir, settings)?;
    let reports = collection.verify_all();
    let failed = reports
        .iter()
        .filter(|report| !output::family_report(report))
        .count();
    if failed > 0 {
        return Err(CliError::VerifyFailed {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

#[instrument(level = "debug", skip(settings))]
fn rebuild<F: TreeFamily>(settings: &Settings, output_path: Option<&Path>) -> CliResult<()> {
    let mut tree = load::<F>(settings)?;
    let numbered = tree.renumber_all()?;
    let named = tree.rebuild_full_names()?;
    tree.verify()?;

    let target = match output_path {
        Some(p) => p.to_path_buf(),
        None => snapshot_path(settings, F::KIND),
    };
    FamilySnapshot::capture(&tree).save(&target)?;
    output::written(
        "Rebuilt",
        &format!("{} ({} nodes, {} full names)", F::NAME, numbered, named),
        &target,
    );
    Ok(())
}

#[instrument(level = "debug", skip(settings))]
fn import<F: TreeFamily>(settings: &Settings, records: &Path) -> CliResult<()> {
    let built = import_file::<F>(records, settings)?;
    let target = snapshot_path(settings, F::KIND);
    FamilySnapshot::capture(&built.tree).save(&target)?;
    output::written(
        "Imported",
        &format!("{} ({} nodes)", F::NAME, built.tree.len()),
        &target,
    );
    Ok(())
}

fn full_name<F: TreeFamily>(settings: &Settings, id: NodeId) -> CliResult<()> {
    let tree = load::<F>(settings)?;
    output::info(&tree.full_name(id)?);
    Ok(())
}

fn resolve<F: TreeFamily>(settings: &Settings, id: NodeId) -> CliResult<()> {
    let tree = load::<F>(settings)?;
    let canonical = tree.resolve(id)?;
    if canonical == id {
        output::info(&format!("{} is accepted", id));
    } else {
        output::info(&format!("{} -> {} ({})", id, canonical, tree.display_name(canonical)));
    }
    Ok(())
}

fn descendants<F: TreeFamily>(settings: &Settings, id: NodeId) -> CliResult<()> {
    let tree = load::<F>(settings)?;
    for node in tree.descendants_of(id)? {
        output::node_row(node);
    }
    Ok(())
}

fn config(settings: &Settings, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::location("global", &p),
                None => output::warning("no home directory, global config disabled"),
            }
            output::location("snapshots", &settings.snapshot_dir);
        }
    }
    Ok(())
}
