use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use genai::{GeminiBackend, GenerativeBackend, InlineImage, MockBackend};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use storyboard::{
    tr, ImageStyle, Locale, MaskEditor, PromptAxis, PromptChoice, SequentialStatus, StoryError,
    StoryStyle, UploadedFile, VideoLength, VideoType, Wizard,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod strokes;

use config::{default_config_path, CliConfig};
use strokes::StrokeFile;

#[derive(Parser)]
#[command(name = "storyframe-cli")]
#[command(about = "Storyframe CLI - Turn a story idea into scene prompts and storyboard images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to <config dir>/storyframe/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the offline scripted backend instead of Gemini
    #[arg(long, global = true)]
    mock: bool,

    /// Message language (en, ko)
    #[arg(long, global = true)]
    locale: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct StoryArgs {
    /// Story idea
    #[arg(short, long, default_value = "")]
    idea: String,

    /// Reference image (PNG, JPEG or GIF, at most 10MB)
    #[arg(short, long)]
    reference: PathBuf,

    /// Story style (fairy-tale, adventure, comedy, mystery, sci-fi, drama)
    #[arg(long, default_value = "fairy-tale")]
    style: StoryStyle,

    /// Image style (photorealistic, cinematic, anime, watercolor, ...)
    #[arg(long, default_value = "photorealistic")]
    image_style: ImageStyle,

    /// Video type (loop, story)
    #[arg(long, default_value = "loop")]
    video_type: VideoType,

    /// Video length (10s, 30s, 60s)
    #[arg(long, default_value = "10s")]
    length: VideoLength,

    /// Let the model rewrite (or invent) the idea first
    #[arg(long)]
    brainstorm: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite an idea into a vivid paragraph, or invent one
    Brainstorm {
        /// Starting idea (empty invents a new one)
        #[arg(default_value = "")]
        idea: String,

        #[arg(long, default_value = "fairy-tale")]
        style: StoryStyle,
    },

    /// Generate the scene list and write it as JSON
    Scenes {
        #[command(flatten)]
        story: StoryArgs,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Walk the whole wizard and save one image per scene
    Run {
        #[command(flatten)]
        story: StoryArgs,

        /// Directory for scene_NN images
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Generate scene by scene, seeding each with the previous pick
        #[arg(long)]
        sequential: bool,

        /// In bulk mode, send each scene's predecessor pick for continuity
        #[arg(long)]
        chain: bool,

        /// Ask for every prompt and image choice on stdin
        #[arg(long)]
        interactive: bool,
    },

    /// Edit an image through a painted mask
    Edit {
        /// Image to edit
        image: PathBuf,

        /// Stroke file (JSON) describing the mask
        #[arg(short, long)]
        strokes: PathBuf,

        /// What to change inside the masked area
        #[arg(short = 'm', long)]
        instruction: String,

        /// Where to write the chosen result
        #[arg(short, long)]
        output: PathBuf,

        /// Candidate to keep (1 or 2)
        #[arg(long, default_value = "1")]
        pick: usize,

        /// Also write the mask composite that is sent for editing
        #[arg(long)]
        composite: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let settings = load_settings(&cli)?;
    let locale = settings.locale();
    let backend = build_backend(&settings);

    let result = match cli.command {
        Commands::Brainstorm { idea, style } => brainstorm_command(backend, idea, style).await,
        Commands::Scenes { story, output } => scenes_command(backend, locale, story, output).await,
        Commands::Run {
            story,
            output,
            sequential,
            chain,
            interactive,
        } => {
            let output = output
                .or_else(|| settings.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("storyboard"));
            run_command(backend, locale, story, output, sequential, chain, interactive).await
        }
        Commands::Edit {
            image,
            strokes,
            instruction,
            output,
            pick,
            composite,
        } => edit_command(backend, image, strokes, instruction, output, pick, composite).await,
    };

    if let Err(err) = &result {
        if let Some(story) = err.downcast_ref::<StoryError>() {
            eprintln!("{}", tr(locale, story.message_key()));
        }
    }
    result
}

fn load_settings(cli: &Cli) -> Result<CliConfig> {
    let path = cli.config.clone().or_else(default_config_path);
    let mut settings = match &path {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    settings.apply_env();
    if cli.mock {
        settings.mock = true;
    }
    if let Some(locale) = &cli.locale {
        if Locale::parse(locale).is_none() {
            bail!("unknown locale '{locale}', expected en or ko");
        }
        settings.locale = Some(locale.clone());
    }
    Ok(settings)
}

/// A missing credential is not fatal here; the wizard reports it when a
/// generation action is attempted.
fn build_backend(settings: &CliConfig) -> Option<Arc<dyn GenerativeBackend>> {
    if settings.mock {
        info!("using scripted mock backend");
        return Some(Arc::new(MockBackend::default()));
    }
    match GeminiBackend::new(settings.gemini_config()) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(err) => {
            warn!(error = %err, "gemini backend unavailable");
            None
        }
    }
}

async fn brainstorm_command(
    backend: Option<Arc<dyn GenerativeBackend>>,
    idea: String,
    style: StoryStyle,
) -> Result<()> {
    let mut wizard = Wizard::new(backend);
    let form = wizard.form_mut()?;
    form.set_idea(idea);
    form.set_story_style(style);
    let idea = wizard.brainstorm().await?;
    println!("{idea}");
    Ok(())
}

async fn prepare_wizard(
    backend: Option<Arc<dyn GenerativeBackend>>,
    locale: Locale,
    story: &StoryArgs,
) -> Result<Wizard> {
    let mut wizard = Wizard::new(backend);
    wizard.set_locale(locale);
    let form = wizard.form_mut()?;
    form.set_idea(story.idea.clone());
    form.set_story_style(story.style);
    form.set_image_style(story.image_style);
    form.set_video_type(story.video_type);
    form.set_video_length(story.length);

    let file = UploadedFile::from_path(&story.reference)
        .with_context(|| format!("reading reference {}", story.reference.display()))?;
    wizard.attach_reference(&file)?;

    if story.brainstorm {
        let idea = wizard.brainstorm().await?;
        info!(idea = %idea, "idea brainstormed");
    }
    Ok(wizard)
}

/// Submit with a terminal progress bar fed from the simulated percentage.
async fn submit_with_progress(wizard: &mut Wizard) -> Result<usize> {
    let (tx, mut rx) = watch::channel(0u8);
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(tr(wizard.locale(), "label.progress"));

    let submit = async move { wizard.submit(Some(&tx)).await };
    let render = async {
        while rx.changed().await.is_ok() {
            bar.set_position(u64::from(*rx.borrow()));
        }
    };
    let (result, ()) = tokio::join!(submit, render);
    match &result {
        Ok(_) => bar.finish(),
        Err(_) => bar.abandon(),
    }
    Ok(result?)
}

async fn scenes_command(
    backend: Option<Arc<dyn GenerativeBackend>>,
    locale: Locale,
    story: StoryArgs,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut wizard = prepare_wizard(backend, locale, &story).await?;
    let count = submit_with_progress(&mut wizard).await?;
    let scenes = wizard.picker().map(|p| p.scenes()).unwrap_or_default();
    match output {
        Some(path) => {
            storyboard::export::save_scene_list(&path, scenes)?;
            info!(count, path = %path.display(), "scene list written");
        }
        None => println!("{}", serde_json::to_string_pretty(scenes)?),
    }
    Ok(())
}

fn ask(question: &str) -> Result<String> {
    print!("{question} ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ask for 1 or 2; anything else keeps `current`.
fn ask_choice(question: &str, current: PromptChoice) -> Result<PromptChoice> {
    let answer = ask(&format!("{question} [1/2, enter keeps {}]", current.index() + 1))?;
    Ok(answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(PromptChoice::from_index)
        .unwrap_or(current))
}

fn pick_prompts(wizard: &mut Wizard, interactive: bool) -> Result<()> {
    let locale = wizard.locale();
    let picker = wizard.picker_mut()?;
    loop {
        if interactive {
            let Some(scene) = picker.current() else {
                break;
            };
            println!("\nScene {}: {}", scene.number(), scene.story());
            for (axis, label) in [
                (PromptAxis::Image, "label.image_prompt"),
                (PromptAxis::Video, "label.video_prompt"),
            ] {
                println!("  {}", tr(locale, label));
                for (idx, variant) in scene.variants(axis).iter().enumerate() {
                    println!("    {}. {}", idx + 1, variant.primary());
                }
            }
            let image = ask_choice(tr(locale, "label.image_prompt"), scene.choice(PromptAxis::Image))?;
            let video = ask_choice(tr(locale, "label.video_prompt"), scene.choice(PromptAxis::Video))?;
            picker.select(PromptAxis::Image, image)?;
            picker.select(PromptAxis::Video, video)?;
        }
        if !picker.can_next() {
            break;
        }
        picker.next();
    }
    wizard.finish_picking()?;
    Ok(())
}

fn ask_candidate(scene: u32, count: usize, interactive: bool) -> Result<usize> {
    if !interactive || count < 2 {
        return Ok(0);
    }
    let answer = ask(&format!("Scene {scene}: keep candidate [1-{count}]"))?;
    Ok(answer
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map_or(0, |n| n - 1))
}

async fn run_command(
    backend: Option<Arc<dyn GenerativeBackend>>,
    locale: Locale,
    story: StoryArgs,
    output: PathBuf,
    sequential: bool,
    chain: bool,
    interactive: bool,
) -> Result<()> {
    let mut wizard = prepare_wizard(backend, locale, &story).await?;
    let count = submit_with_progress(&mut wizard).await?;
    if count == 0 {
        bail!(StoryError::NoScenes);
    }
    pick_prompts(&mut wizard, interactive)?;

    if sequential {
        let mut status = wizard.start_sequential()?;
        loop {
            status = match status {
                SequentialStatus::NeedsCandidates(scene) => {
                    info!(scene, "requesting candidates");
                    wizard.sequential_generate().await?
                }
                SequentialStatus::AwaitingPick(scene) => {
                    let available = wizard
                        .overview()
                        .map_or(0, |o| o.images().candidates(scene).len());
                    let index = ask_candidate(scene, available, interactive)?;
                    wizard.sequential_pick(index)?
                }
                SequentialStatus::Finished => break,
            };
        }
    } else {
        let report = wizard.generate_all(chain).await?;
        if !report.failed.is_empty() {
            bail!("image generation failed for scenes {:?}", report.failed);
        }
        let numbers: Vec<(u32, usize)> = wizard
            .overview()
            .map(|o| {
                o.entries()
                    .iter()
                    .map(|e| (e.number, o.images().candidates(e.number).len()))
                    .collect()
            })
            .unwrap_or_default();
        for (scene, available) in numbers {
            let index = ask_candidate(scene, available, interactive)?;
            wizard.select_image(scene, index)?;
        }
    }

    let files = wizard
        .download_all(&output)
        .with_context(|| format!("saving images to {}", output.display()))?;
    for file in &files {
        println!("{}", file.display());
    }
    Ok(())
}

async fn edit_command(
    backend: Option<Arc<dyn GenerativeBackend>>,
    image: PathBuf,
    strokes: PathBuf,
    instruction: String,
    output: PathBuf,
    pick: usize,
    composite: Option<PathBuf>,
) -> Result<()> {
    let backend = backend.ok_or_else(|| {
        StoryError::MissingCredential("no generation backend is configured".to_string())
    })?;
    let file = UploadedFile::from_path(&image)
        .with_context(|| format!("reading image {}", image.display()))?;
    let source = storyboard::intake::encode_upload(&file)?;
    let mut editor = MaskEditor::open(source)?;
    StrokeFile::load(&strokes)?.replay(&mut editor);
    if !editor.has_mask() {
        warn!("stroke file painted nothing; the whole image may change");
    }

    if let Some(path) = composite {
        write_image(&path, &editor.composite()?)?;
    }

    let count = editor.generate(backend.as_ref(), &instruction).await?.len();
    let index = pick.saturating_sub(1);
    if index >= count {
        bail!("only {count} candidate(s) were returned");
    }
    let edited = editor.accept_and_finish(index)?;
    write_image(&output, &edited)?;
    println!("{}", output.display());
    Ok(())
}

fn write_image(path: &std::path::Path, image: &InlineImage) -> Result<()> {
    let bytes = image.decode().context("decoding image payload")?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
