//! One engine run: snapshot a window, resolve blending logic, paint the
//! cube and subcube layers, and index the window for proximity queries.

use std::collections::BTreeSet;
use std::path::Path;

use cubegrid_blend::{BlendRegistry, PaintEntity, Painter, PainterConfig};
use cubegrid_db::{DocumentBackend, EntityStore, WindowSnapshot};
use cubegrid_spatial::SpatialIndex;
use cubegrid_types::{BackgroundMatrix, BinMap, BlendingLogic, WindowUid, ZAxisConfig};

use serde::Serialize;

use crate::config::{EngineConfig, PainterSettings};
use crate::error::EngineError;
use crate::import;

/// The result of painting one window.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintReport {
    /// The painted window.
    pub window_uid: WindowUid,
    /// Entities in the window snapshot.
    pub entities: usize,
    /// Blending-logic aliases loaded from the store.
    pub aliases: usize,
    /// Bins painted from the window's cube vertices (depth collapsed).
    pub cube_bins: BinMap,
    /// Bins painted from the window's subcubes.
    pub subcube_bins: BinMap,
    /// Entities within `spatial.query_radius` of the painter subject.
    pub near_subject: Option<usize>,
}

/// Painted layers as written to the output file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaintedWindow<'a> {
    window_uid: &'a WindowUid,
    cubes: &'a BinMap,
    subcubes: &'a BinMap,
}

/// Import `config.import` if set, paint the window, and write the bins to
/// `config.output` if set.
pub async fn execute<B: DocumentBackend>(
    store: &EntityStore<B>,
    config: &EngineConfig,
) -> Result<PaintReport, EngineError> {
    if let Some(path) = &config.import {
        tracing::info!(path = %path.display(), "Importing entities");
        let file = import::read(path).await?;
        import::apply(store, file).await?;
    }

    let report = paint(store, config).await?;

    if let Some(path) = &config.output {
        write_output(&report, path).await?;
    }
    Ok(report)
}

/// Write the painted layers of `report` to `path` as pretty JSON.
pub async fn write_output(report: &PaintReport, path: &Path) -> Result<(), EngineError> {
    let painted = PaintedWindow {
        window_uid: &report.window_uid,
        cubes: &report.cube_bins,
        subcubes: &report.subcube_bins,
    };
    let json = serde_json::to_vec_pretty(&painted)?;
    tokio::fs::write(path, json).await?;
    tracing::info!(path = %path.display(), "Painted bins written");
    Ok(())
}

/// Paint `config.window_uid` from `store`.
pub async fn paint<B: DocumentBackend>(
    store: &EntityStore<B>,
    config: &EngineConfig,
) -> Result<PaintReport, EngineError> {
    let window_uid = WindowUid::new(config.window_uid.as_str());
    let snapshot = store.window_snapshot(&window_uid).await?;

    let mut registry = BlendRegistry::with_builtins();
    let aliases = load_aliases(store, &snapshot, &mut registry).await?;
    let painter = Painter::new(painter_config(store, &config.painter).await?, registry)?;

    let cube_layer = [PaintEntity::from_cube_vertices(&snapshot.cube_vertices)];
    let subcube_layer: Vec<PaintEntity> = snapshot
        .subcubes
        .iter()
        .map(|subcube| PaintEntity::from_subcube(subcube, &snapshot.subcube_vertices))
        .collect();

    let cube_bins = painter.create_bins(&cube_layer, false)?;
    let subcube_bins = painter.create_bins(&subcube_layer, config.painter.background)?;

    let entities = snapshot.len();
    let index = SpatialIndex::from_snapshot(snapshot, config.spatial.bin_size)?;
    let near_subject = painter
        .config()
        .subject
        .map(|subject| index.query_near_position(subject, config.spatial.query_radius))
        .transpose()?
        .map(|nearby| nearby.len());

    tracing::info!(
        window = %window_uid,
        entities,
        aliases,
        cube_bins = cube_bins.len(),
        subcube_bins = subcube_bins.len(),
        near_subject,
        "Window painted"
    );

    Ok(PaintReport {
        window_uid,
        entities,
        aliases,
        cube_bins,
        subcube_bins,
        near_subject,
    })
}

/// Register stored `BlendingLogic` records for every blending id the
/// snapshot uses that is not already a built-in name.
async fn load_aliases<B: DocumentBackend>(
    store: &EntityStore<B>,
    snapshot: &WindowSnapshot,
    registry: &mut BlendRegistry,
) -> Result<usize, EngineError> {
    let ids: BTreeSet<&str> = snapshot
        .cubes
        .iter()
        .map(|c| c.blending_logic_id.as_str())
        .chain(snapshot.cube_vertices.iter().map(|v| v.blending_logic_id.as_str()))
        .chain(snapshot.subcubes.iter().map(|s| s.blending_logic_id.as_str()))
        .chain(
            snapshot
                .subcubes
                .iter()
                .flat_map(|s| s.vertex_array.iter().map(|r| r.1.as_str())),
        )
        .filter(|id| !id.is_empty() && !registry.contains(id))
        .collect();

    let mut loaded = 0_usize;
    for id in ids {
        match store.get_record::<BlendingLogic>(id).await? {
            Some(logic) if registry.register_logic(&logic) => loaded = loaded.saturating_add(1),
            Some(_) => {}
            None => tracing::debug!(logic_id = id, "No blending logic stored, using fallback"),
        }
    }
    Ok(loaded)
}

/// Ambient and subject from the settings, or from the stored records they
/// name.
async fn painter_config<B: DocumentBackend>(
    store: &EntityStore<B>,
    settings: &PainterSettings,
) -> Result<PainterConfig, EngineError> {
    let mut config = PainterConfig::new(settings.bin_size, settings.ambient);

    if let Some(id) = &settings.background_matrix {
        match store.get_record::<BackgroundMatrix>(id).await? {
            Some(background) => {
                config = PainterConfig::from_background(&background, settings.bin_size);
            }
            None => {
                tracing::warn!(id = %id, "Background matrix not found, using configured ambient");
            }
        }
    }

    if let Some(subject) = settings.subject {
        config = config.with_subject(subject);
    } else if let Some(id) = &settings.z_axis {
        match store.get_record::<ZAxisConfig>(id).await? {
            Some(z_axis) => config = config.with_subject(z_axis.user_defined_point),
            None => tracing::warn!(id = %id, "Z-axis config not found, painting without a subject"),
        }
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::import::ImportFile;
    use cubegrid_blend::BlendError;
    use cubegrid_db::{MemoryBackend, StoreSchema};
    use cubegrid_types::BinKey;
    use serde_json::json;

    async fn store() -> EntityStore<MemoryBackend> {
        let mut store = EntityStore::new(MemoryBackend::new());
        store
            .initialize("engine-test", 1, StoreSchema::standard())
            .await
            .unwrap();
        store
    }

    fn import_file(vertex_strategy: &str) -> ImportFile {
        serde_json::from_value(json!({
            "hierarchies": [{
                "cube": {
                    "id": "c1", "windowUID": "w", "position": [0, 0, 0],
                    "subcubeIDs": ["s1"], "vertices": [], "blendingLogicId": "blendBackground"
                },
                "subcubes": [{
                    "id": "s1", "windowUID": "w", "center": [5, 5, 5], "order": 0,
                    "vertexArray": [["v1", vertex_strategy], ["v2", vertex_strategy]],
                    "cubeId": "c1", "originID": "wc1", "blendingLogicId": "blendBackground"
                }],
                "subcubeVertices": [
                    {
                        "id": "v1", "windowUID": "w", "cubeId": "c1", "subCubeID": "s1",
                        "originID": "wc1", "value": [[100, 0, 0], [1, 1, 1], 0.5, "blendBackground"]
                    },
                    {
                        "id": "v2", "windowUID": "w", "cubeId": "c1", "subCubeID": "s1",
                        "originID": "wc1", "value": [[0, 100, 0], [2, 2, 2], 0.5, "blendBackground"]
                    }
                ],
                "cubeVertices": [{
                    "vertexID": "cv1", "windowUID": "w",
                    "valueArray": [[0, 0, 200], [25, 0, 0], 1.0, "blendBackground"],
                    "blendingLogicId": "blendBackground"
                }]
            }],
            "matrices": [{
                "type": "BackgroundMatrix",
                "matrix": {
                    "id": "bg", "windowUID": "w", "redLayer": [], "greenLayer": [],
                    "blueLayer": [], "binData": [], "ambientValue": [1, 1, 1],
                    "blendingLogicId": "blendBackground"
                }
            }],
            "blendingLogic": [{ "logicId": "soft", "strategy": "BlendVrtxByWeight" }],
            "zAxis": [{ "id": "z", "cameraPosition": [0, 0, 100], "userDefinedPoint": [0, 0, 0] }]
        }))
        .unwrap()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            window_uid: "w".to_owned(),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn import_then_paint_uses_stored_aliases() {
        let store = store().await;
        let summary = import::apply(&store, import_file("soft")).await.unwrap();
        assert_eq!(summary.hierarchies, 1);
        assert_eq!(summary.hierarchy_documents, 5);
        assert_eq!(summary.matrices, 1);
        assert_eq!(summary.settings, 2);

        let report = paint(&store, &config()).await.unwrap();
        assert_eq!(report.entities, 5);
        assert_eq!(report.aliases, 1);
        assert_eq!(report.near_subject, None);

        // "soft" resolves to the weighted strategy:
        // [0,0,0] -> [50,0,0] -> [25,50,0].
        let bin = report.subcube_bins.get(&BinKey::flat(0, 0)).unwrap();
        assert_eq!(bin.color, [25.0, 50.0, 0.0]);
        assert!(bin.active);

        let cube_bin = report.cube_bins.get(&BinKey::flat(2, 0)).unwrap();
        assert_eq!(cube_bin.color, [0.0, 0.0, 200.0]);
    }

    #[tokio::test]
    async fn stored_background_and_z_axis_configure_the_painter() {
        let store = store().await;
        import::apply(&store, import_file("BlendCornerByProximity"))
            .await
            .unwrap();

        let mut config = config();
        config.painter.background_matrix = Some("bg".to_owned());
        config.painter.z_axis = Some("z".to_owned());
        config.painter.background = true;

        let report = paint(&store, &config).await.unwrap();
        // Cube vertices are painted but not spatially indexed.
        assert_eq!(report.near_subject, Some(4));
        let bin = report.subcube_bins.get(&BinKey::layered(0, 0, 0)).unwrap();
        assert!(bin.active);
        assert_eq!(bin.depth, 2.0);
    }

    #[tokio::test]
    async fn proximity_without_subject_fails() {
        let store = store().await;
        import::apply(&store, import_file("BlendCornerByProximity"))
            .await
            .unwrap();

        let err = paint(&store, &config()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Blend {
                source: BlendError::MissingDistance { .. }
            }
        ));
    }

    #[tokio::test]
    async fn empty_window_paints_nothing() {
        let store = store().await;
        let report = paint(&store, &config()).await.unwrap();
        assert_eq!(report.entities, 0);
        assert!(report.cube_bins.is_empty());
        assert!(report.subcube_bins.is_empty());
    }

    #[tokio::test]
    async fn execute_imports_and_writes_output() {
        let dir = std::env::temp_dir().join(format!("cubegrid-engine-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let input = dir.join("import.json");
        let output = dir.join("bins.json");
        let file = serde_json::to_vec(&json!({
            "hierarchies": [{
                "cube": {
                    "id": "c1", "windowUID": "w", "position": [0, 0, 0],
                    "subcubeIDs": [], "vertices": [], "blendingLogicId": "blendBackground"
                },
                "cubeVertices": [{
                    "vertexID": "cv1", "windowUID": "w",
                    "valueArray": [[10, 20, 30], [-5, 15, 0], 1.0, "blendBackground"],
                    "blendingLogicId": "blendBackground"
                }]
            }]
        }))
        .unwrap();
        tokio::fs::write(&input, file).await.unwrap();

        let store = store().await;
        let config = EngineConfig {
            import: Some(input),
            output: Some(output.clone()),
            ..config()
        };
        let report = execute(&store, &config).await.unwrap();
        assert_eq!(report.entities, 2);

        let written: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&output).await.unwrap()).unwrap();
        assert_eq!(written["windowUid"], json!("w"));
        assert_eq!(written["cubes"]["-1,1"]["color"], json!([10.0, 20.0, 30.0]));
        assert_eq!(written["subcubes"], json!({}));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
