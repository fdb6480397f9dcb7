use anyhow::Context;
use clap::{Parser, Subcommand};
use fatscope_core::{BlockPartition, FsError, ImagePartition, MountOptions};
use fatscope_filesystems::{Fat16Filesystem, Node};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "fatscope")]
#[command(about = "Read-only inspector for FAT16 disk images", long_about = None)]
struct Cli {
    /// Sector where the FAT16 partition starts inside the image
    #[arg(long, global = true, default_value_t = 0)]
    offset: u64,

    /// FAT copy to follow (0 is the primary FAT)
    #[arg(long, global = true, default_value_t = 0)]
    fat_copy: u8,

    /// Mount even if the volume claims more sectors than the image holds
    #[arg(long, global = true)]
    no_verify_size: bool,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show volume geometry and label
    Info {
        image: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a directory
    Ls {
        image: PathBuf,
        #[arg(default_value = "/")]
        path: String,
    },
    /// List a directory tree recursively
    Tree {
        image: PathBuf,
        #[arg(default_value = "/")]
        path: String,
    },
    /// Write a file's contents to stdout
    Cat {
        image: PathBuf,
        path: String,
        /// Start reading at this byte
        #[arg(long)]
        offset_bytes: Option<u64>,
        /// Read at most this many bytes
        #[arg(long)]
        length: Option<usize>,
    },
    /// Show the directory entry behind a path
    Stat {
        image: PathBuf,
        path: String,
    },
}

impl Commands {
    fn image(&self) -> &PathBuf {
        match self {
            Commands::Info { image, .. }
            | Commands::Ls { image, .. }
            | Commands::Tree { image, .. }
            | Commands::Cat { image, .. }
            | Commands::Stat { image, .. } => image,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = MountOptions {
        fat_copy: cli.fat_copy,
        verify_partition_size: !cli.no_verify_size,
    };

    let image = cli.command.image();
    let partition = ImagePartition::open_at(image, cli.offset)
        .with_context(|| format!("Failed to open image {}", image.display()))?;
    let fs = Fat16Filesystem::mount_with_options(partition, options)
        .with_context(|| format!("Failed to mount FAT16 volume in {}", image.display()))?;

    match &cli.command {
        Commands::Info { json, .. } => show_info(&fs, *json)?,
        Commands::Ls { path, .. } => {
            for node in fs.list_directory(path)? {
                println!("{:<9} {:>10}  {}", node.node_type().as_str(), node.size(), node.name());
            }
        }
        Commands::Tree { path, .. } => {
            let node = fs.resolve(path)?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", path)?;
            print_tree(&mut stdout, &node, 1, &mut HashSet::new())?;
        }
        Commands::Cat {
            path,
            offset_bytes,
            length,
            ..
        } => {
            let node = fs.resolve(path)?;
            let file = node
                .as_file()
                .ok_or_else(|| anyhow::anyhow!("{} is a directory", path))?;

            let mut stdout = io::stdout().lock();
            if offset_bytes.is_some() || length.is_some() {
                let data = file.read_bytes(offset_bytes.unwrap_or(0), length.unwrap_or(usize::MAX))?;
                stdout.write_all(&data)?;
            } else {
                let mut handle = file.open();
                io::copy(&mut handle, &mut stdout)?;
            }
            stdout.flush()?;
        }
        Commands::Stat { path, .. } => {
            let node = fs.resolve(path)?;
            println!("Path: {}", path);
            println!("  Type: {}", node.node_type());
            println!("  Size: {} bytes", node.size());
            match node.entry() {
                Some(entry) => {
                    println!("  Name: {}", node.name());
                    println!("  Attributes: {} ({:#04x})", entry.attributes, entry.attributes.0);
                    println!("  First cluster: {}", entry.first_cluster());
                    println!(
                        "  Created: date {:#06x} time {:#06x}",
                        entry.creation_date, entry.creation_time
                    );
                    println!(
                        "  Modified: date {:#06x} time {:#06x}",
                        entry.write_date, entry.write_time
                    );
                    println!("  Accessed: date {:#06x}", entry.last_access_date);
                }
                None => println!("  Root directory (fixed region, no entry)"),
            }
        }
    }

    Ok(())
}

fn show_info<P: BlockPartition>(fs: &Fat16Filesystem<P>, json: bool) -> anyhow::Result<()> {
    let info = fs.info();
    let geometry = fs.geometry();

    if json {
        let value = serde_json::json!({ "volume": info, "geometry": geometry });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Filesystem: {}", info.fs_type);
    println!("  Label: {}", info.label.as_deref().unwrap_or("(none)"));
    println!("  Serial: {:08X}", info.volume_serial);
    println!("  OEM name: {}", info.oem_name);
    println!("  Size: {:.2} MB", info.total_bytes as f64 / 1_048_576.0);
    println!("\nGeometry:");
    println!("  Bytes per sector: {}", geometry.bytes_per_sector);
    println!("  Sectors per cluster: {}", geometry.sectors_per_cluster);
    println!("  Reserved sectors: {}", geometry.reserved_sectors);
    println!("  FATs: {} x {} sectors", geometry.num_fats, geometry.sectors_per_fat);
    println!("  Root entries: {} ({} sectors at {})", geometry.root_entries, geometry.root_dir_sectors, geometry.first_root_dir_sector);
    println!("  First data sector: {}", geometry.first_data_sector);
    println!("  Total sectors: {}", geometry.total_sectors);
    println!("  Total clusters: {}", geometry.total_clusters);
    Ok(())
}

/// First cluster of a directory-like node. The root directory counts as 0,
/// which is also where ".." entries of first-level directories point.
fn directory_cluster<P: BlockPartition>(node: &Node<'_, P>) -> u32 {
    node.entry().map_or(0, |e| e.first_cluster())
}

/// Print the tree below `node`. `ancestors` holds the first clusters of the
/// directories currently being listed; a subdirectory pointing back at one
/// of them is a loop in the directory structure.
fn print_tree<P: BlockPartition, W: Write>(
    out: &mut W,
    node: &Node<'_, P>,
    depth: usize,
    ancestors: &mut HashSet<u32>,
) -> anyhow::Result<()> {
    let cluster = directory_cluster(node);
    ancestors.insert(cluster);

    for child in node.read_entries()? {
        if child.entry().is_some_and(|e| e.is_dot_entry()) {
            continue;
        }

        let indent = "  ".repeat(depth);
        if child.is_directory() {
            writeln!(out, "{}{}/", indent, child.name())?;
            let child_cluster = directory_cluster(&child);
            if ancestors.contains(&child_cluster) {
                return Err(FsError::CorruptFilesystem(format!(
                    "directory {} loops back to cluster {}",
                    child.name(),
                    child_cluster
                ))
                .into());
            }
            print_tree(out, &child, depth + 1, ancestors)?;
        } else {
            writeln!(out, "{}{} ({} bytes)", indent, child.name(), child.size())?;
        }
    }

    ancestors.remove(&cluster);
    Ok(())
}
