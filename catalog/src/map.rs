//! Static tile-map definitions and the Tiled JSON format they are read from.

use dungeon_core::{GridDimensions, MapId};
use serde::Deserialize;

use crate::CatalogError;

/// Tiled stores horizontal, vertical and diagonal flip flags in the top bits of a gid.
const GID_FLAG_MASK: u32 = 0x1fff_ffff;

/// Immutable tile-map definition shared by every session played on it.
#[derive(Clone, Debug, PartialEq)]
pub struct MapDefinition {
    id: MapId,
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    layers: Vec<Layer>,
}

impl MapDefinition {
    /// Creates a map definition, validating dense layer sizes and tile dimensions.
    pub fn new(
        id: MapId,
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        layers: Vec<Layer>,
    ) -> Result<Self, CatalogError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(CatalogError::ZeroTileSize { map: id });
        }

        let expected = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(usize::MAX);
        for layer in &layers {
            if let Layer::Dense(dense) = layer {
                if dense.cells.len() != expected {
                    return Err(CatalogError::LayerSize {
                        map: id,
                        layer: dense.name.clone(),
                        expected,
                        actual: dense.cells.len(),
                    });
                }
            }
        }

        Ok(Self {
            id,
            width,
            height,
            tile_width,
            tile_height,
            layers,
        })
    }

    /// Parses a Tiled JSON export.
    ///
    /// Tile objects are anchored at their bottom-left corner in Tiled; they are
    /// normalised to a top-left anchor so grid coordinates become a plain
    /// division by the tile size.
    pub fn from_tiled_json(id: MapId, json: &str) -> Result<Self, CatalogError> {
        let document: TiledMap =
            serde_json::from_str(json).map_err(|source| CatalogError::Parse {
                what: id.to_string(),
                source,
            })?;

        let layers = document
            .layers
            .into_iter()
            .filter_map(|layer| match layer {
                TiledLayer::TileLayer { name, data } => Some(Layer::Dense(DenseLayer {
                    name,
                    cells: data.into_iter().map(|gid| gid & GID_FLAG_MASK).collect(),
                })),
                TiledLayer::ObjectGroup { name, objects } => Some(Layer::Objects(ObjectLayer {
                    name,
                    objects: objects.into_iter().map(TiledObject::normalise).collect(),
                })),
                TiledLayer::Unsupported => None,
            })
            .collect();

        Self::new(
            id,
            document.width,
            document.height,
            document.tilewidth,
            document.tileheight,
            layers,
        )
    }

    /// Identifier of the map.
    #[must_use]
    pub fn id(&self) -> &MapId {
        &self.id
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Tile width in pixels.
    #[must_use]
    pub const fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Tile height in pixels.
    #[must_use]
    pub const fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Grid snapshot recorded on sessions played on this map.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        GridDimensions {
            width: self.width,
            height: self.height,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
        }
    }

    /// Every layer in declaration order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

/// Named layer of a map.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// One tile-type id per cell, row-major.
    Dense(DenseLayer),
    /// Sparse objects positioned in pixels.
    Objects(ObjectLayer),
}

impl Layer {
    /// Name of the layer.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Dense(layer) => &layer.name,
            Self::Objects(layer) => &layer.name,
        }
    }
}

/// Dense layer storing one tile-type id per cell; zero marks an empty cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenseLayer {
    name: String,
    cells: Vec<u32>,
}

impl DenseLayer {
    /// Creates a dense layer from row-major cells.
    #[must_use]
    pub fn new(name: impl Into<String>, cells: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Name of the layer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row-major cell values.
    #[must_use]
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }
}

/// Sparse layer of placed objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectLayer {
    name: String,
    objects: Vec<PlacedObject>,
}

impl ObjectLayer {
    /// Creates an object layer.
    #[must_use]
    pub fn new(name: impl Into<String>, objects: Vec<PlacedObject>) -> Self {
        Self {
            name: name.into(),
            objects,
        }
    }

    /// Name of the layer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Objects in declaration order.
    #[must_use]
    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }
}

/// Object placed on a map at a pixel position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedObject {
    /// One-based tileset gid; zero for shapes without a graphic.
    pub gid: u32,
    /// Pixel column of the top-left corner.
    pub x: u32,
    /// Pixel row of the top-left corner.
    pub y: u32,
    /// Free-form name assigned in the editor.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TiledMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    layers: Vec<TiledLayer>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TiledLayer {
    #[serde(rename = "tilelayer")]
    TileLayer { name: String, data: Vec<u32> },
    #[serde(rename = "objectgroup")]
    ObjectGroup {
        name: String,
        #[serde(default)]
        objects: Vec<TiledObject>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct TiledObject {
    #[serde(default)]
    gid: Option<u32>,
    x: f64,
    y: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    name: String,
}

impl TiledObject {
    fn normalise(self) -> PlacedObject {
        let top = match self.gid {
            Some(_) => self.y - self.height,
            None => self.y,
        };
        PlacedObject {
            gid: self.gid.map_or(0, |gid| gid & GID_FLAG_MASK),
            x: pixel(self.x),
            y: pixel(top),
            name: self.name,
        }
    }
}

fn pixel(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}
