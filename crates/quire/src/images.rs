// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Aspect-ratio placeholders for local images.
//!
//! A local image (`file://…` or `./…`) becomes a block whose width is 100%
//! (or `?scale=N` percent) and whose top padding is the image's
//! height/width ratio, with the image painted as a contained background.
//! The PDF renderer can lay out the page before decoding the image.

use diagnostics::*;

use crate::error::{Error, Result};
use crate::path_guard::ProjectRoot;

/// A parsed local image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    /// Project-relative path, without the query string.
    pub path: String,
    /// Width percentage from `?scale=`.
    pub scale: Option<String>,
}

impl LocalImage {
    /// `None` for anything that is not a local reference.
    pub fn parse(url: &str) -> Option<Self> {
        let rest = url
            .strip_prefix("file://")
            .or_else(|| url.strip_prefix("./"))?;
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let mut scale = None;
        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                if key == "scale" {
                    if value.parse::<f64>().is_ok_and(|v| v.is_finite() && v > 0.0) {
                        scale = Some(value.into_owned());
                    } else {
                        warn!("Ignoring image scale {value} on {path}", value: &*value, path);
                    }
                }
            }
        }

        Some(Self {
            path: path.to_string(),
            scale,
        })
    }

    pub fn width_style(&self) -> String {
        match &self.scale {
            Some(scale) => format!("{}%", scale),
            None => "100%".to_string(),
        }
    }
}

/// Top padding percentage reserving the image's aspect ratio.
pub fn padding_percent(width: u32, height: u32) -> u64 {
    if width == 0 {
        return 100;
    }
    u64::from(height) * 100 / u64::from(width) + 1
}

pub fn placeholder_html(image: &LocalImage, width: u32, height: u32) -> String {
    format!(
        "<div style=\"margin: auto; width:{}; background: url('{}') no-repeat; background-size: contain;\"><div style=\"height: 0px; padding-top:{}%;\">&nbsp;</div></div>",
        image.width_style(),
        image.path.replace('\'', "%27").replace('"', "%22"),
        padding_percent(width, height)
    )
}

/// Placeholder HTML for a local image, `None` for remote references.
/// The path must stay inside the project.
pub fn placeholder(root: &ProjectRoot, url: &str) -> Result<Option<String>> {
    let Some(image) = LocalImage::parse(url) else {
        return Ok(None);
    };
    let path = root.resolve(&image.path)?;
    let (width, height) = ::image::image_dimensions(&path).map_err(|source| Error::Image {
        path: path.clone(),
        source,
    })?;
    debug!("Image {url} is {width}x{height}", url, width, height);
    Ok(Some(placeholder_html(&image, width, height)))
}
