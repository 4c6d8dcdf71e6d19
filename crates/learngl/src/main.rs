mod cli;
mod config;
mod lessons;
mod mesh;
mod run;
mod window;

use anyhow::Result;
use cli::{Command, ShowArgs};
use config::AppConfig;
use glshader::StageKind;
use lessons::Lesson;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Run(args) => {
            let config = AppConfig::discover(cli.config.as_deref())?;
            run::run(args, config)
        }
        Command::Lessons => {
            run_lessons_list();
            Ok(())
        }
        Command::Show(args) => {
            run_show(args);
            Ok(())
        }
    }
}

fn run_lessons_list() {
    println!("Lessons:");
    for lesson in Lesson::ALL {
        println!("  {:<16} {}", lesson.name(), lesson.summary());
    }
}

fn run_show(args: ShowArgs) {
    let stages = match args.stage {
        Some(stage) => vec![stage],
        None => vec![StageKind::Vertex, StageKind::Fragment],
    };
    for (index, stage) in stages.into_iter().enumerate() {
        if index > 0 {
            println!();
        }
        let source = match stage {
            StageKind::Vertex => args.lesson.vertex_source(),
            StageKind::Fragment => args.lesson.fragment_source(),
        };
        println!("// {} {stage} shader", args.lesson);
        print!("{source}");
        if !source.ends_with('\n') {
            println!();
        }
    }
}
