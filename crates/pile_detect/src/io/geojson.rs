use std::path::Path;

use geojson::{Feature, Geometry, Value};
use serde_json::{json, Map};

use crate::{error::Result, types::Measurement};

impl Measurement {
    /// Closed triangle polygon with metrics and side lengths as properties.
    ///
    /// Geometry is omitted while fewer than three vertices are placed.
    pub fn to_geojson(&self) -> Result<Feature> {
        let geometry = self.triangle.vertices().map(|vertices| {
            let mut ring: Vec<Vec<f64>> = vertices.iter().map(|p| vec![p.x, p.y]).collect();
            ring.push(vec![vertices[0].x, vertices[0].y]);
            Geometry::new(Value::Polygon(vec![ring]))
        });

        let mut properties = Map::new();
        properties.insert("frame".to_string(), json!(self.triangle.frame()));
        properties.insert("base_policy".to_string(), json!(self.policy));
        properties.insert("volume_m3".to_string(), json!(self.metrics.volume));
        properties.insert("mass_t".to_string(), json!(self.metrics.mass));
        properties.insert("radius_m".to_string(), json!(self.metrics.radius));
        properties.insert("height_m".to_string(), json!(self.metrics.height));
        properties.insert("base_length_m".to_string(), json!(self.metrics.base_length));
        properties.insert("sides".to_string(), serde_json::to_value(&self.sides)?);

        Ok(Feature {
            bbox: None,
            geometry,
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        let feature = self.to_geojson()?;
        Ok(serde_json::to_string_pretty(&feature)?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let geojson_string = self.to_geojson_string()?;
        std::fs::write(path, geojson_string)?;
        Ok(())
    }
}
