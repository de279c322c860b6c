use serde::{Deserialize, Serialize};

use crate::error::{WavelayError, WavelayResult};

/// Opacity applied to a layer when the configuration supplies none.
pub const DEFAULT_OPACITY: f64 = 0.3;

/// Where the image stack paints relative to the host's own drawing surfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Overlay,
    Underlay,
}

/// Scaling hint forwarded verbatim to the host scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageRendering {
    #[default]
    Auto,
    CrispEdges,
    Pixelated,
}

impl ImageRendering {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::CrispEdges => "crisp-edges",
            Self::Pixelated => "pixelated",
        }
    }
}

/// Opacity as supplied by the caller: one value for every layer, or one
/// value per layer. Normalized into a plain `Vec<f64>` by
/// [`OverlayOptions::resolve`]; nothing downstream branches on the shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpacitySpec {
    Uniform(f64),
    PerLayer(Vec<f64>),
}

/// Immutable configuration for an overlay compositor.
///
/// Every field except `sources` is optional with a documented default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayOptions {
    /// Image source identifiers in stacking order, bottom first. Opaque to
    /// the compositor; the bundled loader treats them as filesystem paths.
    pub sources: Vec<String>,
    /// Layer opacity, scalar or per-layer. Defaults to 0.3 for every layer.
    #[serde(default)]
    pub opacity: Option<OpacitySpec>,
    /// Overlay (above the waveform) or underlay (below it). Default overlay.
    #[serde(default)]
    pub position: Position,
    /// Ask the host to render its own waveform transparent.
    #[serde(default)]
    pub hide_waveform: bool,
    /// Background color for the bottom layer only, passed through verbatim.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Image scaling hint. Default auto.
    #[serde(default)]
    pub image_rendering: ImageRendering,
    /// Fallback duration in seconds, used only when the host cannot supply
    /// one.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Selector for an explicit mount container. Defaults to the host's own
    /// content wrapper.
    #[serde(default)]
    pub container: Option<String>,
}

impl OverlayOptions {
    pub fn new<S: Into<String>>(sources: impl IntoIterator<Item = S>) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            opacity: None,
            position: Position::default(),
            hide_waveform: false,
            background_color: None,
            image_rendering: ImageRendering::default(),
            duration: None,
            container: None,
        }
    }

    pub fn validate(&self) -> WavelayResult<()> {
        if self.sources.is_empty() {
            return Err(WavelayError::invalid_configuration(
                "at least one image source is required",
            ));
        }
        if let Some(spec) = &self.opacity {
            let values: &[f64] = match spec {
                OpacitySpec::Uniform(value) => std::slice::from_ref(value),
                OpacitySpec::PerLayer(values) => values,
            };
            if values.iter().any(|value| !value.is_finite()) {
                return Err(WavelayError::invalid_configuration(
                    "opacity values must be finite",
                ));
            }
        }
        Ok(())
    }

    /// Validates and normalizes into the form the compositor consumes.
    pub fn resolve(&self) -> WavelayResult<ResolvedOptions> {
        self.validate()?;
        Ok(ResolvedOptions {
            opacities: resolve_opacities(self.opacity.as_ref(), self.sources.len()),
            sources: self.sources.clone(),
            position: self.position,
            hide_waveform: self.hide_waveform,
            background_color: self.background_color.clone(),
            image_rendering: self.image_rendering,
            duration: self.duration,
            container: self.container.clone(),
        })
    }
}

/// Normalized configuration: opacities always number exactly one per source.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedOptions {
    pub sources: Vec<String>,
    pub opacities: Vec<f64>,
    pub position: Position,
    pub hide_waveform: bool,
    pub background_color: Option<String>,
    pub image_rendering: ImageRendering,
    pub duration: Option<f64>,
    pub container: Option<String>,
}

/// Pads or truncates the supplied opacities to `count` entries: missing
/// entries replicate the last supplied value (0.3 when none was supplied),
/// excess entries are dropped. Values are clamped to 0..=1.
fn resolve_opacities(spec: Option<&OpacitySpec>, count: usize) -> Vec<f64> {
    let mut out = match spec {
        None => Vec::new(),
        Some(OpacitySpec::Uniform(value)) => vec![*value; count],
        Some(OpacitySpec::PerLayer(values)) => values.clone(),
    };
    let pad = out.last().copied().unwrap_or(DEFAULT_OPACITY);
    out.resize(count, pad);
    out.truncate(count);
    for value in &mut out {
        *value = value.clamp(0.0, 1.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_opacities_replicate_the_last_supplied() {
        let resolved = resolve_opacities(Some(&OpacitySpec::PerLayer(vec![0.8, 0.6])), 4);
        assert_eq!(resolved, vec![0.8, 0.6, 0.6, 0.6]);
    }

    #[test]
    fn no_opacities_fall_back_to_default() {
        assert_eq!(resolve_opacities(None, 3), vec![0.3, 0.3, 0.3]);
        assert_eq!(
            resolve_opacities(Some(&OpacitySpec::PerLayer(Vec::new())), 2),
            vec![0.3, 0.3]
        );
    }

    #[test]
    fn scalar_replicates_for_every_layer() {
        assert_eq!(
            resolve_opacities(Some(&OpacitySpec::Uniform(0.5)), 3),
            vec![0.5, 0.5, 0.5]
        );
    }

    #[test]
    fn excess_opacities_are_dropped() {
        let resolved = resolve_opacities(Some(&OpacitySpec::PerLayer(vec![0.1, 0.2, 0.3])), 2);
        assert_eq!(resolved, vec![0.1, 0.2]);
    }

    #[test]
    fn opacities_clamp_to_unit_range() {
        let resolved = resolve_opacities(Some(&OpacitySpec::PerLayer(vec![-0.5, 1.5])), 2);
        assert_eq!(resolved, vec![0.0, 1.0]);
    }

    #[test]
    fn resolve_rejects_empty_sources() {
        let options = OverlayOptions::new(Vec::<String>::new());
        assert!(matches!(
            options.resolve(),
            Err(WavelayError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn resolve_rejects_non_finite_opacity() {
        let mut options = OverlayOptions::new(["a.png"]);
        options.opacity = Some(OpacitySpec::Uniform(f64::NAN));
        assert!(options.resolve().is_err());
    }

    #[test]
    fn untagged_opacity_accepts_scalar_and_sequence() {
        let scalar: OverlayOptions =
            serde_json::from_str(r#"{"sources": ["a.png"], "opacity": 0.5}"#).unwrap();
        assert_eq!(scalar.opacity, Some(OpacitySpec::Uniform(0.5)));

        let sequence: OverlayOptions =
            serde_json::from_str(r#"{"sources": ["a.png"], "opacity": [0.5, 0.6]}"#).unwrap();
        assert_eq!(
            sequence.opacity,
            Some(OpacitySpec::PerLayer(vec![0.5, 0.6]))
        );
    }

    #[test]
    fn json_defaults_match_documented_defaults() {
        let options: OverlayOptions =
            serde_json::from_str(r#"{"sources": ["a.png"]}"#).unwrap();
        assert_eq!(options.position, Position::Overlay);
        assert_eq!(options.image_rendering, ImageRendering::Auto);
        assert!(!options.hide_waveform);
        assert!(options.duration.is_none());

        let resolved = options.resolve().unwrap();
        assert_eq!(resolved.opacities, vec![DEFAULT_OPACITY]);
    }

    #[test]
    fn position_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Position::Underlay).unwrap(),
            r#""underlay""#
        );
        assert_eq!(
            serde_json::to_string(&ImageRendering::CrispEdges).unwrap(),
            r#""crisp-edges""#
        );
    }
}
