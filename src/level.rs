//! Level definitions and grid parsing
//!
//! ## Tile legend:
//!   '#' = Wall                   'B' = Block (eliminable)
//!   'P' = Player spawn           'o' = Coin
//!   'C' = Chest                  anything else = Empty
//!
//! A parsed level is a list of body placements, one per non-empty cell,
//! each centered in its cell. The spawn cell becomes a start position and
//! does not produce a body.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::GridCoord;
use crate::consts::TILE_SIZE;
use crate::error::LevelError;
use crate::sim::shape::Shape;
use crate::sim::world::{BodyDef, BodyKind};

/// A level as supplied by the catalog. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: u32,
    pub name: String,
    /// Rows of tile symbols, all the same length
    pub grid: Vec<String>,
    /// Blocks the player may place
    pub block_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub par: Option<u32>,
}

/// Tile symbol in a level grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Wall,
    Block,
    Spawn,
    Coin,
    Chest,
}

impl Tile {
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            '#' => Tile::Wall,
            'B' => Tile::Block,
            'P' => Tile::Spawn,
            'o' => Tile::Coin,
            'C' => Tile::Chest,
            _ => Tile::Empty,
        }
    }

    /// Body kind, shape and sensor flag this tile turns into. Spawn and
    /// empty cells produce no body.
    pub fn body(&self) -> Option<(BodyKind, Shape, bool)> {
        match self {
            Tile::Wall => Some((BodyKind::Wall, Shape::square(TILE_SIZE), false)),
            Tile::Block => Some((BodyKind::Block { placed: false }, block_shape(), false)),
            Tile::Coin => Some((BodyKind::Coin, Shape::circle(TILE_SIZE / 4.0), true)),
            Tile::Chest => Some((BodyKind::Chest, Shape::square(TILE_SIZE * 0.8), true)),
            Tile::Spawn | Tile::Empty => None,
        }
    }
}

/// Shape of a block, pre-placed or built by the player
pub fn block_shape() -> Shape {
    Shape::square(TILE_SIZE - 2.0)
}

/// Request to create one body for a grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub kind: BodyKind,
    pub cell: GridCoord,
    pub center: Vec2,
    pub shape: Shape,
    pub sensor: bool,
}

impl Placement {
    pub fn body_def(&self) -> BodyDef {
        BodyDef::fixed(self.kind, self.center, self.shape, self.sensor)
    }
}

/// A validated level grid, ready to be turned into bodies
#[derive(Debug, Clone)]
pub struct LevelLayout {
    pub placements: Vec<Placement>,
    pub spawn_cell: GridCoord,
    pub spawn: Vec2,
    /// Number of coin cells
    pub coin_total: u32,
    pub cols: usize,
    pub rows: usize,
}

impl LevelLayout {
    /// Parse a level grid. Fails on an empty or ragged grid and unless
    /// there is exactly one spawn cell.
    pub fn parse(level: &Level) -> Result<Self, LevelError> {
        let rows = level.grid.len();
        let cols = level
            .grid
            .first()
            .map(|r| r.chars().count())
            .ok_or(LevelError::EmptyGrid)?;
        if cols == 0 {
            return Err(LevelError::EmptyGrid);
        }

        let mut placements = Vec::new();
        let mut spawn_cell: Option<GridCoord> = None;
        let mut coin_total = 0;

        for (row, line) in level.grid.iter().enumerate() {
            let found = line.chars().count();
            if found != cols {
                return Err(LevelError::RaggedRow {
                    row,
                    expected: cols,
                    found,
                });
            }

            for (col, symbol) in line.chars().enumerate() {
                let cell = GridCoord::new(col as i32, row as i32);
                let tile = Tile::from_symbol(symbol);

                if tile == Tile::Spawn {
                    if let Some(first) = spawn_cell {
                        return Err(LevelError::MultipleSpawns {
                            first,
                            second: cell,
                        });
                    }
                    spawn_cell = Some(cell);
                    continue;
                }

                let Some((kind, shape, sensor)) = tile.body() else {
                    continue;
                };
                if kind == BodyKind::Coin {
                    coin_total += 1;
                }
                placements.push(Placement {
                    kind,
                    cell,
                    center: cell.center(),
                    shape,
                    sensor,
                });
            }
        }

        let spawn_cell = spawn_cell.ok_or(LevelError::MissingSpawn)?;

        Ok(Self {
            placements,
            spawn_cell,
            spawn: spawn_cell.center(),
            coin_total,
            cols,
            rows,
        })
    }

    /// Playfield width in pixels
    pub fn width(&self) -> f32 {
        self.cols as f32 * TILE_SIZE
    }

    /// Playfield height in pixels
    pub fn height(&self) -> f32 {
        self.rows as f32 * TILE_SIZE
    }
}

/// Parse a JSON array of levels, validating every grid
pub fn catalog_from_json(json: &str) -> Result<Vec<Level>, LevelError> {
    let levels: Vec<Level> = serde_json::from_str(json)?;
    for level in &levels {
        LevelLayout::parse(level)?;
    }
    log::info!("Loaded level catalog with {} levels", levels.len());
    Ok(levels)
}
