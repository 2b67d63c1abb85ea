//! `ration shopping-list` and `ration aggregate`.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use ration_core::shopping::{EMPTY_SHOPPING_LIST, build_shopping_list, shopping_list_for_meals};
use ration_core::store::PlanStore;

use crate::plan_cmds::{PlanTarget, load_plan};

/// Print the shopping list over the recipes stored for a week plan.
pub async fn run_shopping_list<S: PlanStore + ?Sized>(store: &S, target: &PlanTarget) -> Result<()> {
    let plan = load_plan(store, target).await?;
    let meals: Vec<_> = plan.meals().cloned().collect();
    println!("{}", shopping_list_for_meals(&meals));
    Ok(())
}

/// Print the shopping list for ingredient lines read from a file or stdin.
pub fn run_aggregate(path: &Path) -> Result<()> {
    let input = read_input(path)?;
    println!("{}", aggregate_text(&input));
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read ingredients from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ingredient file: {}", path.display()))
}

fn aggregate_text(input: &str) -> String {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();
    let list = build_shopping_list(&lines);
    if list.is_empty() {
        EMPTY_SHOPPING_LIST.to_owned()
    } else {
        list
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        let text = "# ужин\n200 г куриной грудки\n\n100 г куриной грудки\n  2 зубчика чеснока  \n";
        assert_eq!(
            aggregate_text(text),
            "Мясо и рыба\n • 300 г куриная грудка\n\nОвощи\n • 2 зубч чеснок"
        );
    }

    #[test]
    fn empty_input_prints_placeholder() {
        assert_eq!(aggregate_text("\n# nothing\n"), EMPTY_SHOPPING_LIST);
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 зубчик чеснока").unwrap();
        let text = read_input(file.path()).unwrap();
        assert_eq!(text, "1 зубчик чеснока\n");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_input(Path::new("/nonexistent/ingredients.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ingredients.txt"));
    }
}
