use eframe::egui::{self, RichText, Ui};
use serde_json::Value;

use crate::data::GraphSnapshot;

use super::super::render::RenderMode;
use super::super::{DetailsSlot, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Node Details");
        ui.add_space(6.0);

        let Some(selection) = self.panel_selection.clone() else {
            ui.label("Click a node in the graph to inspect it.");
            if self.render.mode() == RenderMode::Gpu {
                ui.small("Selection is unavailable while the batched backend is active.");
            }
            return;
        };

        ui.label(RichText::new(selection.label.as_str()).strong());
        ui.small(selection.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Category: {}", selection.kind.label()));
        ui.label(format!("Dependencies (out): {}", selection.out_degree));
        ui.label(format!("Dependents (in): {}", selection.in_degree));

        if let Some(&index) = self.snapshot.index_by_id.get(&selection.id) {
            neighbor_list(ui, &self.snapshot, "Direct dependencies", &self.snapshot.outgoing[index]);
            neighbor_list(ui, &self.snapshot, "Direct dependents", &self.snapshot.incoming[index]);
        }

        ui.separator();
        ui.label(RichText::new("Analyzer details").strong());
        match &self.details {
            DetailsSlot::Absent => {
                ui.label("No detail source configured.");
            }
            DetailsSlot::Idle | DetailsSlot::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading details...");
                });
            }
            DetailsSlot::Degraded => {
                ui.label("Details unavailable for this session.");
            }
            DetailsSlot::Ready(store) => match store.get(&selection.id) {
                Some(payload) => {
                    egui::ScrollArea::vertical()
                        .id_salt("detail_payload_scroll")
                        .auto_shrink([false, true])
                        .show(ui, |ui| {
                            for line in payload_lines(payload, 0) {
                                ui.label(line);
                            }
                        });
                }
                None => {
                    ui.label("No details recorded for this node.");
                }
            },
        }
    }
}

const NEIGHBOR_ROWS: usize = 12;

fn neighbor_list(ui: &mut Ui, snapshot: &GraphSnapshot, title: &str, neighbors: &[usize]) {
    if neighbors.is_empty() {
        return;
    }

    ui.separator();
    ui.label(RichText::new(title).strong());
    for &neighbor in neighbors.iter().take(NEIGHBOR_ROWS) {
        if let Some(node) = snapshot.nodes.get(neighbor) {
            ui.label(format!("- {}", node.label));
        }
    }
    if neighbors.len() > NEIGHBOR_ROWS {
        ui.small(format!("and {} more", neighbors.len() - NEIGHBOR_ROWS));
    }
}

/// Flattens an arbitrary analyzer payload into indented display lines; the
/// viewer forwards whatever the upstream source produced.
fn payload_lines(value: &Value, indent: usize) -> Vec<String> {
    let pad = "  ".repeat(indent);
    let mut lines = Vec::new();

    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                match scalar_text(key, entry) {
                    Some(text) => lines.push(format!("{pad}{key}: {text}")),
                    None => {
                        lines.push(format!("{pad}{key}:"));
                        lines.extend(payload_lines(entry, indent + 1));
                    }
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                match scalar_text("", entry) {
                    Some(text) => lines.push(format!("{pad}- {text}")),
                    None => {
                        lines.push(format!("{pad}-"));
                        lines.extend(payload_lines(entry, indent + 1));
                    }
                }
            }
        }
        other => {
            if let Some(text) = scalar_text("", other) {
                lines.push(format!("{pad}{text}"));
            }
        }
    }

    lines
}

fn scalar_text(key: &str, value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("-".to_string()),
        Value::Bool(flag) => Some(if *flag { "yes" } else { "no" }.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Array(entries) if entries.iter().all(Value::is_string) => {
            let parts: Vec<&str> = entries.iter().filter_map(Value::as_str).collect();
            // Chains read as a path; everything else as a plain list.
            let separator = if key == "path" { " -> " } else { ", " };
            Some(parts.join(separator))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_payload_fields_become_single_lines() {
        let payload: Value = serde_json::from_str(
            r#"{"impactScore": 7.25, "breakingChanges": true, "affectedRepos": ["r1", "r2"]}"#,
        )
        .expect("valid JSON");

        let lines = payload_lines(&payload, 0);
        assert!(lines.contains(&"impactScore: 7.25".to_string()));
        assert!(lines.contains(&"breakingChanges: yes".to_string()));
        assert!(lines.contains(&"affectedRepos: r1, r2".to_string()));
    }

    #[test]
    fn dependency_chains_render_as_paths() {
        let payload: Value = serde_json::from_str(
            r#"{"chains": [{"length": 3, "circular": false, "path": ["a", "b", "c"]}]}"#,
        )
        .expect("valid JSON");

        let lines = payload_lines(&payload, 0);
        assert!(lines.iter().any(|line| line.contains("path: a -> b -> c")));
        assert!(lines.iter().any(|line| line.contains("circular: no")));
    }
}
