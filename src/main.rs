//! Workout plan tracker: reads a published sheet and keeps per-exercise
//! progress on this machine.

use eframe::{App, Frame, NativeOptions, egui};
use rfd::FileDialog;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

mod controller;
use controller::{AppState, Controller, Dataset, Event, Outcome};
mod filters;
use filters::Choice;
mod normalize;
use normalize::ExerciseRecord;
mod progress;
use progress::{ExerciseIdentity, ProgressStore};
mod render;
use render::{ExerciseView, Group};
mod report;
mod settings;
use settings::Settings;
mod sheet;
use sheet::SheetError;
mod storage;
use storage::{FileStore, KeyValueStore, MemoryStore};
mod timer;
use timer::{RestTimer, SystemClock, TimerDisplay};

const ALL_PLANS: &str = "Todas";
const ALL_DAYS: &str = "Todos";

type Store = Box<dyn KeyValueStore>;
type LoadResult = Result<Vec<ExerciseRecord>, SheetError>;

fn open_store(settings: &Settings) -> Store {
    match settings.store_path() {
        Some(path) => {
            log::info!("Using progress file {}", path.display());
            let store = FileStore::open(path);
            if store.is_read_only() {
                log::warn!("Progress changes this session will not be saved");
            }
            Box::new(store)
        }
        None => {
            log::warn!("No config directory found; progress kept in memory only");
            Box::new(MemoryStore::new())
        }
    }
}

/// Fetch the sheet on a worker thread and wake the UI when it is done.
fn spawn_load(url: String, ctx: egui::Context) -> Receiver<LoadResult> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = sheet::load_dataset(&url);
        let _ = tx.send(result);
        ctx.request_repaint();
    });
    rx
}

struct TrackerApp {
    settings: Settings,
    controller: Controller<Store>,
    pending: Option<Receiver<LoadResult>>,
    load_inputs: HashMap<ExerciseIdentity, String>,
    confirm_clear: bool,
    status: Option<String>,
}

impl TrackerApp {
    fn new(ctx: &egui::Context, settings: Settings) -> Self {
        let controller = Controller::new(
            ProgressStore::new(open_store(&settings)),
            Box::new(SystemClock),
            settings.done_window(),
        );
        let mut app = Self {
            settings,
            controller,
            pending: None,
            load_inputs: HashMap::new(),
            confirm_clear: false,
            status: None,
        };
        match app.settings.fetch_url() {
            Ok(url) => app.pending = Some(spawn_load(url, ctx.clone())),
            Err(e) => app.controller.finish_loading(Err(SheetError::Url(e))),
        }
        app
    }

    fn poll_loading(&mut self) {
        let Some(rx) = self.pending.as_ref() else {
            return;
        };
        let received = rx.try_recv();
        match received {
            Ok(result) => {
                self.controller.finish_loading(result);
                self.pending = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.controller
                    .finish_loading(Err(SheetError::Network("carregamento interrompido".into())));
                self.pending = None;
            }
        }
    }

    fn apply(&mut self, events: Vec<Event>) {
        for event in events {
            match self.controller.dispatch(event) {
                Outcome::Cleared(n) => {
                    self.load_inputs.clear();
                    self.status = Some(format!("{n} registros de progresso removidos"));
                }
                Outcome::Toggled(done) => log::debug!("Completion toggled to {done}"),
                _ => {}
            }
        }
    }

    fn export_html(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("HTML", &["html"])
            .set_file_name("ficha.html")
            .save_file()
        else {
            return;
        };
        match report::export_html(&path, &self.controller.state().groups) {
            Ok(()) => {
                self.status = Some(format!("Ficha exportada para {}", path.display()));
                if let Err(e) = open::that(&path) {
                    log::warn!("Failed to open {}: {e}", path.display());
                }
            }
            Err(e) => {
                log::error!("Failed to export HTML: {e}");
                self.status = Some(format!("Falha ao exportar: {e}"));
            }
        }
    }
}

fn choice_combo(
    ui: &mut egui::Ui,
    label: &str,
    all_label: &str,
    current: &Choice,
    options: &[String],
) -> Option<Choice> {
    let mut picked = None;
    let selected_text = match current {
        Choice::All => all_label.to_string(),
        Choice::Only(v) => v.clone(),
    };
    egui::ComboBox::from_label(label)
        .selected_text(selected_text)
        .show_ui(ui, |ui| {
            if ui
                .selectable_label(*current == Choice::All, all_label)
                .clicked()
            {
                picked = Some(Choice::All);
            }
            for opt in options {
                let selected = matches!(current, Choice::Only(v) if v == opt);
                if ui.selectable_label(selected, opt.as_str()).clicked() {
                    picked = Some(Choice::Only(opt.clone()));
                }
            }
        });
    picked.filter(|p| p != current)
}

fn draw_card(
    ui: &mut egui::Ui,
    view: &ExerciseView,
    timer: Option<&RestTimer>,
    inputs: &mut HashMap<ExerciseIdentity, String>,
    events: &mut Vec<Event>,
) {
    let r = &view.record;
    let frame = if view.display_completed {
        egui::Frame::group(ui.style()).fill(egui::Color32::from_rgb(0x1f, 0x3a, 0x2c))
    } else {
        egui::Frame::group(ui.style())
    };
    frame.show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading(r.exercise_name.as_str());
                ui.label(format!("Grupo: {}", r.muscle_group));
                ui.label(format!("Séries: {} · Reps: {}", r.sets, r.reps));
                ui.label(format!("Execução: {}", r.technique));
                ui.label(format!("Obs: {}", r.notes));
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(rest) = view.rest {
                    let display = timer.map_or(TimerDisplay::Idle(rest), RestTimer::display);
                    let enabled = timer.map_or(true, RestTimer::can_start);
                    if ui
                        .add_enabled(enabled, egui::Button::new(display.to_string()))
                        .clicked()
                    {
                        events.push(Event::TimerStart {
                            control: view.identity.clone(),
                            duration: rest,
                        });
                    }
                }

                let label = if view.display_completed {
                    "✅ Concluído"
                } else {
                    "✔ Concluir"
                };
                let toggled = ui.button(label).clicked();

                let shown = view.display_load.to_string();
                let buf = inputs
                    .entry(view.identity.clone())
                    .or_insert_with(|| shown.clone());
                let resp = ui.add(egui::TextEdit::singleline(buf).desired_width(60.0));
                ui.label("Carga:");

                if (resp.lost_focus() || toggled) && *buf != shown {
                    events.push(Event::LoadEdited {
                        identity: view.identity.clone(),
                        value: buf.clone(),
                    });
                }
                if toggled {
                    events.push(Event::ToggleCompleted(view.identity.clone()));
                }
            });
        });
    });
}

fn draw_groups(
    ui: &mut egui::Ui,
    state: &AppState,
    inputs: &mut HashMap<ExerciseIdentity, String>,
    events: &mut Vec<Event>,
) {
    egui::ScrollArea::vertical().show(ui, |ui| {
        for group in &state.groups {
            ui.add_space(8.0);
            ui.label(egui::RichText::new(group.title()).size(20.0).strong());
            if let Group::Day { exercises, .. } = group {
                for view in exercises {
                    draw_card(ui, view, state.timer(&view.identity), inputs, events);
                }
            }
        }
    });
}

impl App for TrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_loading();
        self.controller.dispatch(Event::Tick);

        let mut events = Vec::new();
        let mut export = false;

        egui::TopBottomPanel::top("filters").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let state = self.controller.state();
                if let Some(plan) =
                    choice_combo(ui, "Ficha", ALL_PLANS, &state.selection.plan, &state.plans)
                {
                    events.push(Event::PlanChanged(plan));
                }
                if let Some(day) = choice_combo(
                    ui,
                    "Treino",
                    ALL_DAYS,
                    &state.selection.workout_day,
                    &state.workout_days,
                ) {
                    events.push(Event::WorkoutDayChanged(day));
                }
                let ready = matches!(state.dataset, Dataset::Ready(_));
                if ui
                    .add_enabled(ready, egui::Button::new("Limpar progresso"))
                    .clicked()
                {
                    self.confirm_clear = true;
                }
                if ui
                    .add_enabled(ready, egui::Button::new("Exportar HTML"))
                    .clicked()
                {
                    export = true;
                }
            });
        });

        if let Some(msg) = &self.status {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.label(msg.as_str());
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let state = self.controller.state();
            match &state.dataset {
                Dataset::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Carregando ficha...");
                    });
                }
                Dataset::Failed(msg) => {
                    ui.label(format!("❌ Erro ao carregar ficha. ({msg})"));
                    ui.label("Verifique publicação e republique se necessário.");
                }
                Dataset::Ready(_) => {
                    draw_groups(ui, state, &mut self.load_inputs, &mut events);
                }
            }
        });

        if self.confirm_clear {
            let mut close = false;
            egui::Window::new("Limpar progresso")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Limpar todo o progresso salvo (cargas e concluídos)?");
                    ui.horizontal(|ui| {
                        if ui.button("Limpar").clicked() {
                            events.push(Event::ClearClicked);
                            close = true;
                        }
                        if ui.button("Cancelar").clicked() {
                            close = true;
                        }
                    });
                });
            if close {
                self.confirm_clear = false;
            }
        }

        self.apply(events);
        if export {
            self.export_html();
        }

        if self.controller.state().any_timer_active() {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.settings.save();
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let settings = Settings::load();
    let options = NativeOptions::default();
    eframe::run_native(
        "FlavinShape Ficha de Treino",
        options,
        Box::new(move |cc| Box::new(TrackerApp::new(&cc.egui_ctx, settings))),
    )
}
