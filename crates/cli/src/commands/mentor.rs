//! Hint and validation commands

use std::path::PathBuf;

use anyhow::Result;
use autolab_common::ApiStyle;
use clap::Args;
use serde::Serialize;

use super::{Context, Source};
use crate::output::{print_error, print_success, print_warning, render_structured};

#[derive(Args)]
pub struct HintArgs {
    /// Scenario ID
    pub id: String,

    /// Question for the mentor
    #[arg(required = true, trailing_var_arg = true)]
    pub question: Vec<String>,

    /// API style to ask about
    #[arg(long)]
    pub style: Option<ApiStyle>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Scenario ID
    pub id: String,

    /// Script file, `-` for stdin; defaults to the saved code
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// API style the script is written against
    #[arg(long)]
    pub style: Option<ApiStyle>,
}

#[derive(Serialize)]
struct HintOutput<'a> {
    scenario: &'a str,
    style: ApiStyle,
    answer: String,
}

pub async fn hint(ctx: &Context, args: HintArgs) -> Result<()> {
    let store = ctx.store().await;
    let scenario = ctx.scenario(&args.id)?;
    let style = ctx.style_for(scenario, args.style, &store)?;
    let question = args.question.join(" ");

    let answer = ctx
        .mentor()
        .hint(&question, style, Some(&scenario.description))
        .await;

    let output = HintOutput {
        scenario: &scenario.id,
        style,
        answer,
    };
    match render_structured(&output, ctx.format)? {
        Some(text) => println!("{}", text),
        None => println!("{}", output.answer),
    }
    Ok(())
}

pub async fn verify(ctx: &Context, args: VerifyArgs) -> Result<()> {
    let mut store = ctx.store().await;
    let scenario = ctx.scenario(&args.id)?;
    let style = ctx.style_for(scenario, args.style, &store)?;
    let code = Source::new(args.file.as_ref(), false).load(scenario, style, &store)?;

    let verdict = ctx.mentor().validate(&code, scenario, style).await;
    if verdict.is_correct && store.mark_completed(&scenario.id, style) {
        store.save_best_effort().await;
    }

    if let Some(text) = render_structured(&verdict, ctx.format)? {
        println!("{}", text);
        return Ok(());
    }
    if verdict.is_correct {
        print_success(&format!("{} solved in {}", scenario.title, style));
    } else if verdict.feedback == autolab_sandbox::mentor::VALIDATION_FALLBACK {
        print_warning(&verdict.feedback);
        return Ok(());
    } else {
        print_error("Not quite there yet");
    }
    println!();
    println!("{}", verdict.feedback);
    Ok(())
}
