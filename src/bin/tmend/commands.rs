use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};

use traj_mend::io::{self, Format, topo::TopologyFile};
use traj_mend::{
    Cell, MoleculeMap, System, atom_spread, center_of_weight, define_molecules, join_trajectory,
    lattice_symmetry, align_frames,
};

use crate::cli::{Command, InspectArgs, JoinArgs, TopologyArgs};
use crate::display::{Context as DisplayContext, Progress};

pub fn dispatch(command: Command, ctx: DisplayContext) -> Result<()> {
    match command {
        Command::Topology(args) => run_topology(args, ctx),
        Command::Join(args) => run_join(args, ctx),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn read_input(path: &Path, cell_override: &Option<Vec<f64>>) -> Result<System> {
    let mut system = io::xyz::read_file(path)
        .with_context(|| format!("could not read '{}'", path.display()))?;
    if let Some(values) = cell_override {
        let mut cell = [0.0; 6];
        cell.copy_from_slice(values);
        system.cell = Some(Cell::from_array(cell));
    }
    Ok(system)
}

fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}{suffix}"))
}

fn run_topology(args: TopologyArgs, ctx: DisplayContext) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive);

    progress.step("Reading structure");
    let system = read_input(&args.io.input, &args.detect.cell)?;
    progress.complete_step(&format!(
        "Read {} atoms, {} frame(s) [{}]",
        system.atom_count(),
        system.frame_count(),
        system.molecular_formula()
    ));

    progress.step("Detecting molecules");
    let config = args.detect.mend_config(Default::default());
    let map = define_molecules(
        system.positions(),
        &system.elements,
        system.cell.as_ref(),
        &config,
    )
    .context("molecule detection failed")?;
    progress.complete_step(&format!("Found {} molecules", map.n_molecules()));

    progress.step("Writing topology");
    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.io.input, ".topo.toml"));
    io::topo::write_file(&output, &TopologyFile::new(&system, &map))
        .with_context(|| format!("could not write '{}'", output.display()))?;
    progress.complete_step(&format!("Wrote {}", output.display()));

    progress.finish();
    Ok(())
}

fn resolve_molecule_map(
    args: &JoinArgs,
    system: &System,
) -> Result<(MoleculeMap, Option<Vec<f64>>)> {
    if let Some(path) = &args.topology {
        let topo = io::topo::read_file(path)
            .with_context(|| format!("could not read topology '{}'", path.display()))?;
        topo.matches(system)?;
        let map = topo.molecule_map()?;
        return Ok((map, topo.weights));
    }
    let config = args.detect.mend_config(Default::default());
    let map = define_molecules(
        system.positions(),
        &system.elements,
        system.cell.as_ref(),
        &config,
    )
    .context("molecule detection failed")?;
    Ok((map, None))
}

fn run_join(args: JoinArgs, ctx: DisplayContext) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive);

    progress.step("Reading trajectory");
    let system = read_input(&args.io.input, &args.detect.cell)?;
    progress.complete_step(&format!(
        "Read {} atoms, {} frame(s)",
        system.atom_count(),
        system.frame_count()
    ));

    progress.step("Resolving topology");
    let (map, topo_weights) = resolve_molecule_map(&args, &system)?;
    progress.complete_step(&format!("{} molecules", map.n_molecules()));

    let weights = if args.geometric {
        None
    } else {
        Some(topo_weights.unwrap_or_else(|| system.masses()))
    };

    progress.step("Joining molecules");
    let config = args.detect.mend_config(args.mode.into());
    let joined = join_trajectory(
        &system.frames,
        &system.elements,
        &map,
        system.cell.as_ref(),
        weights.as_deref(),
        &config,
    )
    .context("joining failed")?;
    let patched = joined.patched_edges;
    progress.complete_step(&if patched == 0 {
        "Joined all molecules".to_string()
    } else {
        format!("Joined all molecules ({patched} bridged edge(s))")
    });

    let mut out_system = System {
        elements: system.elements.clone(),
        frames: joined.frames,
        cell: system.cell,
    };

    if args.align {
        progress.step("Aligning frames");
        let w = weights
            .clone()
            .unwrap_or_else(|| vec![1.0; out_system.atom_count()]);
        align_frames(&mut out_system.frames, &w, None, None);
        progress.complete_step("Aligned frames onto the first frame");
    }

    progress.step("Writing output");
    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.io.input, ".mended.xyz"));
    match Format::from_path(&output) {
        Some(Format::Pdb) => io::pdb::write_file(&output, &out_system, &map),
        Some(Format::Xyz) | None => io::xyz::write_file(&output, &out_system),
        Some(other) => bail!("cannot write trajectory as {other}"),
    }
    .with_context(|| format!("could not write '{}'", output.display()))?;
    progress.complete_step(&format!("Wrote {}", output.display()));

    progress.finish();
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let system = read_input(&args.io.input, &args.detect.cell)?;
    let config = args.detect.mend_config(Default::default());
    let map = define_molecules(
        system.positions(),
        &system.elements,
        system.cell.as_ref(),
        &config,
    )
    .context("molecule detection failed")?;

    println!("atoms:     {}", system.atom_count());
    println!("frames:    {}", system.frame_count());
    println!("formula:   {}", system.molecular_formula());
    match system.cell {
        Some(cell) => println!(
            "cell:      {} ({})",
            cell,
            lattice_symmetry(Some(&cell))
        ),
        None => println!("cell:      none"),
    }
    println!("molecules: {}", map.n_molecules());

    let spread = atom_spread(system.positions());
    println!(
        "spread:    {:.3} {:.3} {:.3}",
        spread[0], spread[1], spread[2]
    );
    let weights = vec![1.0; system.atom_count()];
    let cog = center_of_weight(system.positions(), &weights);
    println!("centre:    {:.3} {:.3} {:.3}", cog[0], cog[1], cog[2]);
    Ok(())
}
