use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use html::{
    AttrChange, Document, FilterName, Replacer, Strainer, TreeBuilderConfig, collect_links,
    parse, prettify, tag_counts, to_markup,
};
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const PREVIEW_CHARS: usize = 40;

#[derive(Parser)]
#[command(name = "strainer")]
#[command(about = "Inspect and rewrite HTML with parse-time filtering.", long_about = None)]
struct Cli {
    /// Skip elements with this tag name, along with everything inside them.
    #[arg(long, value_name = "TAG", global = true)]
    exclude: Vec<String>,

    /// Match `--exclude` against tag names as written in the source rather
    /// than after renaming.
    #[arg(long, global = true)]
    filter_source_names: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text and href of every link.
    Links { file: PathBuf },
    /// Count elements per tag name.
    Tags { file: PathBuf },
    /// List elements carrying an `id` attribute.
    Ids { file: PathBuf },
    /// Show the parent of every link and the nearest `div` around every paragraph.
    Parents { file: PathBuf },
    /// Rename a tag while parsing and write the result.
    Rename {
        file: PathBuf,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Add or replace an attribute on every element with the given tag.
    SetAttr {
        file: PathBuf,
        #[arg(long)]
        tag: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write an indented rendering of the document.
    Pretty {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();
    run(&cli, &mut stdout)
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Command::Links { file } => {
            let mut skipped = cli.exclude.clone();
            skipped.extend(["script".to_string(), "style".to_string()]);
            let doc = load(file, &config(&skipped, cli.filter_source_names))?;
            for link in collect_links(doc.root()) {
                writeln!(out, "{}\t{}", link.text, link.href.as_deref().unwrap_or("-"))?;
            }
        }
        Command::Tags { file } => {
            let doc = load(file, &config(&cli.exclude, cli.filter_source_names))?;
            let counts = tag_counts(doc.root());
            for (name, count) in &counts {
                writeln!(out, "{name}: {count}")?;
            }
            writeln!(out, "total: {}", counts.values().sum::<usize>())?;
        }
        Command::Ids { file } => {
            let doc = load(file, &config(&cli.exclude, cli.filter_source_names))?;
            for node in doc.root().find_all_with_attr("id") {
                let name = node.name().unwrap_or_default();
                let id = node.attr("id").unwrap_or_default();
                writeln!(out, "<{name} id=\"{id}\"> {}", preview(&node.stripped_text()))?;
            }
        }
        Command::Parents { file } => {
            let doc = load(file, &config(&cli.exclude, cli.filter_source_names))?;
            for (i, link) in doc.root().find_all("a").enumerate() {
                let parent = link.parent().and_then(|p| p.name()).unwrap_or("#document");
                writeln!(out, "a[{i}] parent: <{parent}>")?;
            }
            for (i, para) in doc.root().find_all("p").enumerate() {
                match para.find_parent("div") {
                    Some(div) => {
                        let label = div.attr("id").map(|id| format!(" id=\"{id}\"")).unwrap_or_default();
                        writeln!(out, "p[{i}] nearest div: <div{label}>")?;
                    }
                    None => writeln!(out, "p[{i}] nearest div: none")?,
                }
            }
        }
        Command::Rename {
            file,
            from,
            to,
            out: target,
        } => {
            let config = config(&cli.exclude, cli.filter_source_names)
                .with_rewriter(Replacer::new(from.as_str(), to.as_str()));
            let doc = load(file, &config)?;
            let target = target.clone().unwrap_or_else(|| output_path(file, "renamed"));
            save(&target, &to_markup(&doc))?;
            writeln!(out, "wrote {}", target.display())?;
        }
        Command::SetAttr {
            file,
            tag,
            name,
            value,
            out: target,
        } => {
            let mut doc = load(file, &config(&cli.exclude, cli.filter_source_names))?;
            let (added, replaced) = set_attr_on_all(&mut doc, tag, name, value);
            let target = target.clone().unwrap_or_else(|| output_path(file, "modified"));
            save(&target, &to_markup(&doc))?;
            writeln!(
                out,
                "{added} added, {replaced} replaced; wrote {}",
                target.display()
            )?;
        }
        Command::Pretty { file, out: target } => {
            let doc = load(file, &config(&cli.exclude, cli.filter_source_names))?;
            let target = target.clone().unwrap_or_else(|| output_path(file, "pretty"));
            save(&target, &prettify(&doc))?;
            writeln!(out, "wrote {}", target.display())?;
        }
    }
    Ok(())
}

fn config(exclude: &[String], filter_source_names: bool) -> TreeBuilderConfig {
    let filter = if exclude.is_empty() {
        Strainer::Any
    } else {
        Strainer::names(exclude.iter().cloned()).negate()
    };
    let filter_on = if filter_source_names {
        FilterName::Source
    } else {
        FilterName::Rewritten
    };
    TreeBuilderConfig::default()
        .with_filter(filter)
        .filter_on(filter_on)
}

fn load(path: &Path, config: &TreeBuilderConfig) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc = parse(clean_source(&raw), config)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    log::debug!(target: "strainer", "parsed {}: {} nodes", path.display(), doc.len());
    Ok(doc)
}

fn save(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Drops a UTF-8 byte order mark and leading whitespace.
fn clean_source(raw: &str) -> &str {
    raw.strip_prefix('\u{feff}').unwrap_or(raw).trim_start()
}

fn set_attr_on_all(doc: &mut Document, tag: &str, name: &str, value: &str) -> (usize, usize) {
    let mut added = 0;
    let mut replaced = 0;
    for id in doc.element_ids(tag) {
        match doc.set_attr(id, name, value) {
            Some(AttrChange::Added) => added += 1,
            Some(AttrChange::Replaced(_)) => replaced += 1,
            None => {}
        }
    }
    (added, replaced)
}

/// `dir/page.html` + `renamed` -> `dir/page_renamed.html`.
fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    input.with_file_name(file_name)
}

fn preview(text: &str) -> String {
    let mut out: String = text
        .chars()
        .take(PREVIEW_CHARS)
        .map(|ch| if ch == '\n' { ' ' } else { ch })
        .collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_on(args: &[&str]) -> String {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut out = Vec::new();
        run(&cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn fixture(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("strainer-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    const PAGE: &str = "\u{feff}\n  <html><body><div id=\"main\"><p>Hello <b>world</b></p>\
<a href=\"/x\">X</a></div><script>var a = '<a href=\"/no\">';</script>\
<p id=\"lone\">Outside</p></body></html>";

    #[test]
    fn output_path_appends_suffix_to_stem() {
        assert_eq!(
            output_path(Path::new("dir/page.html"), "renamed"),
            PathBuf::from("dir/page_renamed.html")
        );
        assert_eq!(output_path(Path::new("notes"), "pretty"), PathBuf::from("notes_pretty"));
    }

    #[test]
    fn clean_source_strips_bom_and_leading_whitespace() {
        assert_eq!(clean_source("\u{feff}\n <p>"), "<p>");
        assert_eq!(clean_source("<p> "), "<p> ");
    }

    #[test]
    fn preview_truncates_long_text() {
        assert_eq!(preview("short\ntext"), "short text");
        let long = "x".repeat(PREVIEW_CHARS + 5);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 1);
    }

    #[test]
    fn links_tags_ids_and_parents() {
        let path = fixture("inspect.html", PAGE);
        let file = path.to_str().unwrap();

        assert_eq!(run_on(&["strainer", "links", file]), "X\t/x\n");

        let tags = run_on(&["strainer", "tags", file]);
        assert!(tags.contains("p: 2\n"));
        assert!(tags.contains("script: 1\n"));
        assert!(tags.ends_with("total: 8\n"));

        let without_scripts = run_on(&["strainer", "--exclude", "script", "tags", file]);
        assert!(!without_scripts.contains("script"));

        assert_eq!(
            run_on(&["strainer", "ids", file]),
            "<div id=\"main\"> Hello world X\n<p id=\"lone\"> Outside\n"
        );

        assert_eq!(
            run_on(&["strainer", "parents", file]),
            "a[0] parent: <div>\np[0] nearest div: <div id=\"main\">\np[1] nearest div: none\n"
        );
    }

    #[test]
    fn rename_set_attr_and_pretty_write_files() {
        let path = fixture("edit.html", "<p>a <b>bold</b></p><p class=\"x\">b</p>");
        let file = path.to_str().unwrap();

        run_on(&["strainer", "rename", file, "--from", "b", "--to", "blockquote"]);
        let renamed = fs::read_to_string(output_path(&path, "renamed")).unwrap();
        assert_eq!(renamed, "<p>a <blockquote>bold</blockquote></p><p class=\"x\">b</p>");

        let report = run_on(&[
            "strainer", "set-attr", file, "--tag", "p", "--name", "class", "--value", "test",
        ]);
        assert!(report.starts_with("1 added, 1 replaced"));
        let modified = fs::read_to_string(output_path(&path, "modified")).unwrap();
        assert_eq!(modified, "<p class=\"test\">a <b>bold</b></p><p class=\"test\">b</p>");

        let target = path.with_file_name("custom_pretty.html");
        run_on(&["strainer", "pretty", file, "--out", target.to_str().unwrap()]);
        let pretty = fs::read_to_string(&target).unwrap();
        assert!(pretty.starts_with("<p>\n a\n <b>\n  bold\n </b>\n</p>\n"));
    }

    #[test]
    fn filter_can_match_source_names() {
        let path = fixture("source.html", "<div><b>gone</b><i>kept</i></div>");
        let file = path.to_str().unwrap();
        let args = |extra: &'static [&'static str]| {
            let mut args = vec!["strainer", "--exclude", "b"];
            args.extend_from_slice(extra);
            args.extend(["rename", file, "--from", "b", "--to", "strong"]);
            args
        };

        run_on(&args(&[]));
        let renamed = fs::read_to_string(output_path(&path, "renamed")).unwrap();
        assert_eq!(renamed, "<div><strong>gone</strong><i>kept</i></div>");

        run_on(&args(&["--filter-source-names"]));
        let renamed = fs::read_to_string(output_path(&path, "renamed")).unwrap();
        assert_eq!(renamed, "<div><i>kept</i></div>");
    }
}
