use crate::render::{ExerciseView, Group};
use maud::{DOCTYPE, Markup, html};
use std::path::Path;

const PLACEHOLDER_BG: &str = "#eef2ff";
const PLACEHOLDER_FG: &str = "#0f172a";

/// Up to two upper-case initials of `label`, `EX` when it has none.
pub fn initials(label: &str) -> String {
    let letters: String = label
        .split_whitespace()
        .take(2)
        .filter_map(|w| w.chars().next())
        .collect();
    if letters.is_empty() {
        "EX".into()
    } else {
        letters.to_uppercase()
    }
}

/// Inline SVG tile showing the initials of `label`.
pub fn placeholder_svg(label: &str, width: u32, height: u32) -> Markup {
    html! {
        svg xmlns="http://www.w3.org/2000/svg" width=(width) height=(height) {
            rect width="100%" height="100%" fill=(PLACEHOLDER_BG) {}
            text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle"
                font-family="Arial,Helvetica,sans-serif" font-size="48" fill=(PLACEHOLDER_FG) {
                (initials(label))
            }
        }
    }
}

fn card(view: &ExerciseView) -> Markup {
    let r = &view.record;
    html! {
        div class=(if view.display_completed { "exercicio concluido" } else { "exercicio" }) {
            div class="left" { (placeholder_svg(&r.exercise_name, 300, 200)) }
            div class="meta" {
                h3 { (r.exercise_name) }
                div class="row" { strong { "Grupo:" } " " (r.muscle_group) }
                div class="row" {
                    strong { "Séries:" } " " (r.sets) " · " strong { "Reps:" } " " (r.reps)
                }
                div class="row" { strong { "Execução:" } " " (r.technique) }
                div class="row" { strong { "Obs:" } " " (r.notes) }
                @if let Some(rest) = view.rest {
                    div class="row" { strong { "Descanso:" } " " (rest) "s" }
                }
            }
            div class="controls" {
                span class="carga" { "Carga: " (view.display_load.to_string()) }
                @if view.display_completed {
                    span class="status" { "✅ Concluído" }
                } @else {
                    span class="status" { "✔ Pendente" }
                }
            }
        }
    }
}

fn build_html(groups: &[Group], generated: &str) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "Ficha de treino" }
                style {
                    ".treino-group{margin-bottom:24px}"
                    ".treino-titulo{font-size:1.4em;font-weight:bold;margin:12px 0}"
                    ".exercicio{display:flex;gap:12px;border:1px solid #ddd;padding:8px;margin:6px 0}"
                    ".concluido{background:#ecfdf5}"
                }
            }
            body {
                p class="gerado" { "Gerado em " (generated) }
                @for group in groups {
                    div class="treino-group" {
                        div class="treino-titulo" { (group.title()) }
                        @for view in group.exercises() {
                            (card(view))
                        }
                    }
                }
            }
        }
    }
}

/// Write the rendered groups as a standalone HTML page.
pub fn export_html<P: AsRef<Path>>(path: P, groups: &[Group]) -> std::io::Result<()> {
    let generated = chrono::Local::now().format("%d/%m/%Y %H:%M").to_string();
    let markup = build_html(groups, &generated);
    std::fs::write(path, markup.into_string())
}
