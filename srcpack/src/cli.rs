// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        config::{PackConfig, ResolverPosition},
        logging,
        packing::Packer,
    },
    anyhow::{anyhow, Context, Result},
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    packed_sources::LineDirective,
    packed_sources_importer::{
        FilesystemFinder, HookPosition, LazyResolver, LoadError, LoaderChain, PackedArtifact,
    },
    std::{io::Write, path::PathBuf, sync::Arc},
};

const SRCPACK_VERSION: &str = env!("CARGO_PKG_VERSION");

const PACK_ABOUT: &str = "\
Pack source units into a self-resolving artifact.

Each RESOURCE is a unit identifier such as `app.util`, a resource path such
as `app/util.pkg`, or a directory ending in `/` whose files with the
configured extension are all packed.

Resources are looked up in the search paths in order. The artifact is the
optional preamble, the rendered bootstrap section, the optional postamble
and finally the archive holding every resource.

Settings may also come from a JSON file passed with --config. Arguments
given on the command line take precedence over the file.
";

const RESOLVE_ABOUT: &str = "\
Resolve a unit the way the runtime resolver does.

The resolver is registered in a loader chain at the position recorded in the
artifact. Directories passed with --search-path form an ordinary filesystem
finder that the resolver is layered in front of or behind.
";

fn artifact_arg() -> Arg {
    Arg::new("artifact")
        .value_name("ARTIFACT")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Path to a generated artifact")
}

fn search_path_arg() -> Arg {
    Arg::new("search_path")
        .short('I')
        .long("search-path")
        .action(ArgAction::Append)
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Directory to search for resources")
}

fn flag(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id.replace('_', "-"))
        .action(ArgAction::SetTrue)
        .help(help)
}

fn path_option(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id.replace('_', "-"))
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn command() -> Command {
    let app = Command::new("srcpack")
        .version(SRCPACK_VERSION)
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Pack library source units into self-resolving artifacts")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times"),
        );

    let app = app.subcommand(
        Command::new("pack")
            .about("Pack source units into a self-resolving artifact")
            .long_about(PACK_ABOUT)
            .arg(path_option("config", "JSON file holding packing settings"))
            .arg(search_path_arg())
            .arg(
                Arg::new("extension")
                    .long("extension")
                    .value_name("EXT")
                    .help("Suffix of resource files, including any leading dot"),
            )
            .arg(
                Arg::new("package_index")
                    .long("package-index")
                    .value_name("STEM")
                    .help("File stem of the resource standing for a whole package"),
            )
            .arg(path_option("preamble", "File whose content starts the artifact"))
            .arg(path_option(
                "postamble",
                "File whose content follows the bootstrap section",
            ))
            .arg(path_option(
                "bootstrap_template",
                "Handlebars template rendering the bootstrap section",
            ))
            .arg(
                Arg::new("resolver_position")
                    .long("resolver-position")
                    .value_parser(["front", "back"])
                    .help("Register the resolver before or after other finders"),
            )
            .arg(
                Arg::new("line_marker")
                    .long("line-marker")
                    .value_name("MARKER")
                    .help("Prefix every stored content line with MARKER"),
            )
            .arg(flag(
                "allow_duplicates",
                "Let later resources replace earlier ones with the same name",
            ))
            .arg(flag("strip_comments", "Remove comment lines"))
            .arg(flag(
                "strip_whitespace",
                "Remove blank lines and trailing whitespace",
            ))
            .arg(flag("strip_docs", "Remove documentation blocks"))
            .arg(flag("strip_logging", "Remove logging statements"))
            .arg(flag(
                "preserve_line_numbers",
                "Leave an empty line in place of every removed line",
            ))
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .help("Write the artifact to PATH instead of stdout"),
            )
            .arg(flag("overwrite", "Replace an existing output file"))
            .arg(
                Arg::new("resources")
                    .value_name("RESOURCE")
                    .action(ArgAction::Append)
                    .help("Resources to pack"),
            ),
    );

    let app = app.subcommand(
        Command::new("list")
            .about("Print the resources held by an artifact")
            .arg(artifact_arg()),
    );

    let app = app.subcommand(
        Command::new("resolve")
            .about("Print the content a unit name resolves to")
            .long_about(RESOLVE_ABOUT)
            .arg(flag("annotate", "Precede content with a line directive"))
            .arg(search_path_arg())
            .arg(artifact_arg())
            .arg(
                Arg::new("name")
                    .value_name("NAME")
                    .required(true)
                    .help("Unit name to resolve"),
            ),
    );

    app.subcommand(
        Command::new("locate-line")
            .about("Map an artifact line number back to a resource line")
            .arg(artifact_arg())
            .arg(
                Arg::new("line")
                    .value_name("LINE")
                    .required(true)
                    .value_parser(value_parser!(usize))
                    .help("1-based line number within the artifact"),
            ),
    )
}

/// Merge `pack` arguments into a [PackConfig].
fn pack_config(args: &ArgMatches) -> Result<PackConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => PackConfig::from_path(path)?,
        None => PackConfig::default(),
    };

    if let Some(paths) = args.get_many::<PathBuf>("search_path") {
        config.search_paths.extend(paths.cloned());
    }
    if let Some(resources) = args.get_many::<String>("resources") {
        config.resources.extend(resources.cloned());
    }

    if let Some(extension) = args.get_one::<String>("extension") {
        config.extension = extension.clone();
    }
    if let Some(index) = args.get_one::<String>("package_index") {
        config.package_index = Some(index.clone());
    }
    if let Some(path) = args.get_one::<PathBuf>("preamble") {
        config.preamble = Some(path.clone());
    }
    if let Some(path) = args.get_one::<PathBuf>("postamble") {
        config.postamble = Some(path.clone());
    }
    if let Some(path) = args.get_one::<PathBuf>("bootstrap_template") {
        config.bootstrap_template = Some(path.clone());
    }
    if let Some(position) = args.get_one::<String>("resolver_position") {
        config.resolver_position = match position.as_str() {
            "back" => ResolverPosition::Back,
            _ => ResolverPosition::Front,
        };
    }
    if let Some(marker) = args.get_one::<String>("line_marker") {
        config.line_marker = Some(marker.clone());
    }
    if let Some(path) = args.get_one::<PathBuf>("output") {
        config.output = Some(path.clone());
    }

    config.allow_duplicates |= args.get_flag("allow_duplicates");
    config.overwrite |= args.get_flag("overwrite");
    config.strip.remove_comments |= args.get_flag("strip_comments");
    config.strip.remove_whitespace |= args.get_flag("strip_whitespace");
    config.strip.remove_doc_blocks |= args.get_flag("strip_docs");
    config.strip.remove_log_statements |= args.get_flag("strip_logging");
    config.strip.preserve_line_numbers |= args.get_flag("preserve_line_numbers");

    if config.resources.is_empty() {
        return Err(anyhow!(
            "no resources to pack; pass RESOURCE arguments or list them in a config file"
        ));
    }

    Ok(config)
}

fn command_pack(args: &ArgMatches) -> Result<i32> {
    let packer = Packer::new(pack_config(args)?);

    if let Some(data) = packer.run()? {
        std::io::stdout()
            .write_all(&data)
            .context("writing artifact to stdout")?;
    }

    Ok(0)
}

fn command_list(args: &ArgMatches) -> Result<i32> {
    let path = args
        .get_one::<PathBuf>("artifact")
        .ok_or_else(|| anyhow!("artifact argument is required"))?;

    let artifact = PackedArtifact::open(path)?;
    let toc = artifact
        .table_of_contents()
        .with_context(|| format!("reading {}", path.display()))?;
    let layout = artifact.line_layout()?;

    for entry in toc.iter() {
        println!(
            "{}\t{}\t{}\t{}",
            entry.metadata.order,
            layout.first_line(&entry.metadata),
            entry.length,
            entry.name
        );
    }

    Ok(0)
}

fn command_resolve(args: &ArgMatches) -> Result<i32> {
    let path = args
        .get_one::<PathBuf>("artifact")
        .ok_or_else(|| anyhow!("artifact argument is required"))?;
    let name = args
        .get_one::<String>("name")
        .ok_or_else(|| anyhow!("name argument is required"))?;

    let resolver = LazyResolver::new(PackedArtifact::open(path)?);

    let mut chain = LoaderChain::default();

    if let Some(paths) = args.get_many::<PathBuf>("search_path") {
        let finder = FilesystemFinder::new(
            paths.cloned().collect(),
            resolver.artifact().settings().naming.clone(),
        );
        chain.register(Arc::new(finder), HookPosition::Back);
    }

    resolver.install(&mut chain);

    let source = match chain.load(name) {
        Ok(source) => source,
        Err(LoadError::NotFound { name }) => {
            eprintln!("{} not found in {}", name, path.display());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let content = if args.get_flag("annotate") {
        source.annotated(&LineDirective::default())
    } else {
        source.content
    };

    std::io::stdout()
        .write_all(&content)
        .context("writing content to stdout")?;

    Ok(0)
}

fn command_locate_line(args: &ArgMatches) -> Result<i32> {
    let path = args
        .get_one::<PathBuf>("artifact")
        .ok_or_else(|| anyhow!("artifact argument is required"))?;
    let line = *args
        .get_one::<usize>("line")
        .ok_or_else(|| anyhow!("line argument is required"))?;

    match PackedArtifact::open(path)?.locate_line(line)? {
        Some((name, local)) => {
            println!("{}:{}", name, local);
            Ok(0)
        }
        None => {
            eprintln!(
                "line {} of {} is not part of any resource",
                line,
                path.display()
            );
            Ok(1)
        }
    }
}

pub fn run_cli() -> Result<i32> {
    let matches = command().get_matches();

    logging::init(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("pack", args)) => command_pack(args),
        Some(("list", args)) => command_list(args),
        Some(("resolve", args)) => command_resolve(args),
        Some(("locate-line", args)) => command_locate_line(args),
        _ => Err(anyhow!("invalid sub-command")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition() {
        command().debug_assert();
    }

    #[test]
    fn test_pack_config_merges_arguments() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("srcpack.json");
        std::fs::write(
            &config_path,
            r#"{"resources": ["a"], "search_paths": ["src"], "extension": ".lua"}"#,
        )?;

        let matches = command().try_get_matches_from([
            "srcpack",
            "pack",
            "--config",
            config_path.to_str().unwrap(),
            "-I",
            "/extra",
            "--extension",
            ".pkg",
            "--resolver-position",
            "back",
            "--strip-whitespace",
            "--preserve-line-numbers",
            "b",
        ])?;
        let (_, args) = matches.subcommand().unwrap();
        let config = pack_config(args)?;

        assert_eq!(config.resources, vec!["a", "b"]);
        assert_eq!(
            config.search_paths,
            vec![dir.path().join("src"), PathBuf::from("/extra")]
        );
        assert_eq!(config.extension, ".pkg");
        assert_eq!(config.resolver_position, ResolverPosition::Back);
        assert!(config.strip.remove_whitespace);
        assert!(config.strip.preserve_line_numbers);
        assert!(!config.strip.remove_comments);

        Ok(())
    }

    #[test]
    fn test_pack_requires_resources() -> Result<()> {
        let matches = command().try_get_matches_from(["srcpack", "pack", "-I", "src"])?;
        let (_, args) = matches.subcommand().unwrap();
        assert!(pack_config(args).is_err());

        Ok(())
    }
}
