use clap::Parser as _;
use color_eyre::eyre::WrapErr as _;

use wlpump::{pump, rt, wl, Config, Connection, Pump, Result};

#[derive(clap::Parser)]
struct Args {
	/// Display socket name or absolute path.
	#[arg(short, long)]
	display: Option<String>,

	#[arg(short, long)]
	config: Option<std::path::PathBuf>,

	/// Keep listening for global changes until the server disconnects.
	#[arg(short, long)]
	follow: bool,
}

struct State {
	client: wl::Client,
	follow: bool,
}

fn main() -> Result<()> {
	color_eyre::install()?;

	let args = Args::parse();
	let config = Config::read_from_config_file(args.config.as_deref())?;

	env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or(config.log_level.as_str()),
	)
	.init();

	let display = args.display.or(config.display);
	let connection = Connection::connect(display.as_deref())
		.wrap_err("failed to connect to the wayland server")?
		.with_read_chunk(config.read_chunk);

	let mut state = State {
		client: wl::Client::new(),
		follow: args.follow,
	};

	let mut pump = Pump::new(connection)?;
	pump.submit(state.client.get_registry())?;
	pump.submit(state.client.sync())?;

	log::info!("connected on fd {}", pump.fd());

	let mut runtime = rt::Runtime::<State>::new();

	runtime.on(pump, |event, state: &mut State, runtime| match event {
		pump::Event::Message(incoming) => {
			state.client.dispatch(&incoming.message)?;

			if state.client.is_synced() && !state.follow {
				runtime.stop();
			}

			Ok(())
		}
		pump::Event::Closed(x) => {
			runtime.stop();

			if !state.client.is_synced() {
				color_eyre::eyre::bail!("server went away before the round trip: {x}");
			}

			log::info!("server went away: {x}");
			Ok(())
		}
	});

	runtime.on(
		rt::producers::Signals::new(&[
			nix::sys::signal::Signal::SIGINT,
			nix::sys::signal::Signal::SIGTERM,
		])?,
		|signal, _, runtime| {
			log::info!("received {signal}, stopping");
			runtime.stop();

			Ok(())
		},
	);

	runtime.run(&mut state)?;

	drop(runtime);

	for global in state.client.globals() {
		println!("{:>4} {} v{}", global.name, global.interface, global.version);
	}

	Ok(())
}
