use std::path::Path;

use crate::error::CropError;

/// One detector output row: class, normalized box center/size, confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: i32,
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

/// Parse one annotation line.
///
/// Blank lines yield `Ok(None)`. Anything else must be exactly six
/// whitespace-separated numeric tokens
/// (`class cx cy width height confidence`); a malformed line is an error
/// carrying the file path and 1-based line number.
pub fn parse_detection_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<Detection>, CropError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Anything past the seventh token is already malformed, no need to collect it.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(7).collect();

    if tokens.len() != 6 {
        return Err(CropError::AnnotationParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("expected 6 tokens, found {}", tokens.len()),
        });
    }

    let class_id = tokens[0]
        .parse::<i32>()
        .map_err(|_| CropError::AnnotationParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("invalid class_id '{}'; expected integer", tokens[0]),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let width = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let height = parse_f64_token(tokens[4], "height", file_path, line_num)?;
    let confidence = parse_f64_token(tokens[5], "confidence", file_path, line_num)?;

    Ok(Some(Detection {
        class_id,
        cx,
        cy,
        width,
        height,
        confidence,
    }))
}

fn parse_f64_token(
    token: &str,
    field: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, CropError> {
    token.parse::<f64>().map_err(|_| CropError::AnnotationParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message: format!("invalid {} '{}'; expected number", field, token),
    })
}
