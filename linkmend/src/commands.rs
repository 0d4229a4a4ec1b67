use clap::{Command, arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

fn site_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(-s --"site" <URL>)
            .required(false)
            .help("Documentation site base URL, e.g. https://docs.example.com"),
    )
}

fn repository_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(-r --"repo" <REPO>)
            .required(false)
            .help("GitHub repository: owner/repo or a github.com URL (tree/blob links select branch and path)"),
    )
    .arg(
        arg!(-b --"branch" <BRANCH>)
            .required(false)
            .help("Branch to read documents from (default: main)"),
    )
    .arg(
        arg!(-p --"path" <PATH>)
            .required(false)
            .help("Directory or single file to scan (default: whole repository)"),
    )
    .arg(
        arg!(-j --"concurrency" <NUM>)
            .required(false)
            .help("Live probes in flight per document")
            .value_parser(clap::value_parser!(usize)),
    )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkmend")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkmend")
        .about("Find broken documentation links in a GitHub repository and open a pull request fixing them")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Configuration file")
                .default_value(linkmend_core::config::DEFAULT_CONFIG_PATH),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes a default configuration file")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the configuration")
                        .default_value(linkmend_core::config::DEFAULT_CONFIG_PATH),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite an existing configuration file")
                        .required(false),
                ),
        )
        .subcommand(
            repository_args(site_args(
                command!("scan").about(
                    "Scan repository documents for broken links to the documentation site",
                ),
            ))
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Save report to file (default: display to screen)")
                    .value_parser(clap::value_parser!(std::path::PathBuf)),
            )
            .arg(
                arg!(-f --"format" <FORMAT>)
                    .required(false)
                    .help("Report format: text, json, csv, markdown (default: from --output extension, else text)")
                    .value_parser(["text", "json", "csv", "markdown", "md"]),
            ),
        )
        .subcommand(
            repository_args(site_args(command!("fix").about(
                "Scan, then open a draft pull request replacing broken links with the best suggestion",
            )))
            .arg(
                arg!(--"min-confidence" <PERCENT>)
                    .required(false)
                    .help("Only apply fixes at or above this confidence (0-100)")
                    .value_parser(clap::value_parser!(u8).range(0..=100)),
            )
            .arg(
                arg!(--"branch-name" <NAME>)
                    .required(false)
                    .help("Name of the branch to create (default: fix-doc-links-<millis>)"),
            )
            .arg(
                arg!(-y --"yes")
                    .required(false)
                    .help("Do not ask for confirmation before opening the pull request")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                arg!(--"dry-run")
                    .required(false)
                    .help("Show the planned changes without writing anything")
                    .action(clap::ArgAction::SetTrue),
            ),
        )
        .subcommand(
            site_args(command!("check").about("Check a single URL against the sitemap and a live probe"))
                .arg(arg!(<URL>).help("The URL to check")),
        )
        .subcommand(
            site_args(command!("suggest").about("Rank sitemap pages as replacements for a URL"))
                .arg(arg!(<URL>).help("The broken URL"))
                .arg(
                    arg!(-l --"limit" <NUM>)
                        .required(false)
                        .help("Maximum number of suggestions")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Print suggestions as JSON")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
