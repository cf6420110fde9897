//! Line-oriented edit scripts for the `edit` subcommand.
//!
//! One command per line; blank lines and `#` comments are skipped:
//!
//! ```text
//! filter sepia
//! brightness 70
//! rotate 90
//! flip h
//! crop 0.1 0.1 0.8 0.8
//! undo
//! save
//! ```

use std::str::FromStr;

use thiserror::Error;

use crate::catalog::FilterId;
use crate::crop::CropRect;
use crate::session::FlipAxis;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Filter(FilterId),
    Brightness(i32),
    Contrast(i32),
    Saturation(i32),
    Rotate(f32),
    Flip(FlipAxis),
    Crop(CropRect),
    Undo,
    Redo,
    Save,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

/// Parses a whole script, stopping at the first bad line.
pub fn parse_script(text: &str) -> Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    let mut commands = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        match parse_line(raw) {
            Ok(Some(cmd)) => commands.push((line, cmd)),
            Ok(None) => {}
            Err(message) => return Err(ScriptError { line, message }),
        }
    }
    Ok(commands)
}

pub fn parse_line(raw: &str) -> Result<Option<ScriptCommand>, String> {
    let content = raw.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }

    let mut words = content.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let verb = verb.to_ascii_lowercase();

    let cmd = match verb.as_str() {
        "filter" => {
            if args.is_empty() {
                return Err("filter needs a name".to_string());
            }
            ScriptCommand::Filter(FilterId::from_str(&args.join(" "))?)
        }
        "brightness" => ScriptCommand::Brightness(progress(&verb, &args)?),
        "contrast" => ScriptCommand::Contrast(progress(&verb, &args)?),
        "saturation" => ScriptCommand::Saturation(progress(&verb, &args)?),
        "rotate" => {
            let [degrees] = exact::<1>(&verb, &args)?;
            let degrees: f32 = number(degrees)?;
            if !degrees.is_finite() {
                return Err(format!("rotation {degrees} is not finite"));
            }
            ScriptCommand::Rotate(degrees)
        }
        "flip" => {
            let [axis] = exact::<1>(&verb, &args)?;
            match axis.to_ascii_lowercase().as_str() {
                "h" | "horizontal" => ScriptCommand::Flip(FlipAxis::Horizontal),
                "v" | "vertical" => ScriptCommand::Flip(FlipAxis::Vertical),
                other => return Err(format!("unknown flip axis `{other}`, expected h or v")),
            }
        }
        "crop" => {
            let [x, y, width, height] = exact::<4>(&verb, &args)?;
            ScriptCommand::Crop(CropRect {
                x: number(x)?,
                y: number(y)?,
                width: number(width)?,
                height: number(height)?,
            })
        }
        "undo" => no_args(&verb, &args, ScriptCommand::Undo)?,
        "redo" => no_args(&verb, &args, ScriptCommand::Redo)?,
        "save" => no_args(&verb, &args, ScriptCommand::Save)?,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(cmd))
}

fn exact<'a, const N: usize>(verb: &str, args: &[&'a str]) -> Result<[&'a str; N], String> {
    <[&str; N]>::try_from(args)
        .map_err(|_| format!("{verb} takes {N} argument(s), got {}", args.len()))
}

fn no_args(verb: &str, args: &[&str], cmd: ScriptCommand) -> Result<ScriptCommand, String> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(format!("{verb} takes no arguments"))
    }
}

fn number<T: FromStr>(word: &str) -> Result<T, String> {
    word.parse().map_err(|_| format!("`{word}` is not a number"))
}

fn progress(verb: &str, args: &[&str]) -> Result<i32, String> {
    let [value] = exact::<1>(verb, args)?;
    let value: i32 = number(value)?;
    if !(0..=100).contains(&value) {
        return Err(format!("{verb} must be between 0 and 100, got {value}"));
    }
    Ok(value)
}
