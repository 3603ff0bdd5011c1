#![no_std]
#![no_main]

use arcade_core::{ConfigStore, Pipeline, Transport};
use arcade_io::board::{
    disable_jtag, CONFIG_REGION, INPUTS, INPUT_COUNT, USB_MANUFACTURER, USB_PID, USB_PRODUCT,
    USB_VID,
};
use arcade_io::vendor_handler::{publish_active_config, CONFIG_COMMAND, SAVE_GUARD};
use arcade_io::{
    output_mode, reset_task, BoardReset, FlashStorage, GpioBank, Leds, SenseLine, UsbDriver,
    VendorHandler,
};
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::peripherals::USB;
use embassy_stm32::time::Hertz;
use embassy_stm32::usb::Driver;
use embassy_stm32::{bind_interrupts, usb, Config};
use embassy_time::{Instant, Timer};
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

#[cfg(feature = "mode-jvs")]
bind_interrupts!(struct Irqs {
    USB_LP_CAN1_RX0 => usb::InterruptHandler<USB>;
    USART1 => embassy_stm32::usart::InterruptHandler<embassy_stm32::peripherals::USART1>;
});

#[cfg(not(feature = "mode-jvs"))]
bind_interrupts!(struct Irqs {
    USB_LP_CAN1_RX0 => usb::InterruptHandler<USB>;
});

/// USB device configuration buffers. The control buffer holds a whole
/// mapping block.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 640]> = StaticCell::new();

static VENDOR_HANDLER: StaticCell<VendorHandler> = StaticCell::new();

#[cfg(not(feature = "mode-jvs"))]
static HID_STATE: StaticCell<embassy_usb::class::hid::State> = StaticCell::new();

#[cfg(feature = "mode-jvs")]
static JVS_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

fn clock_config() -> Config {
    use embassy_stm32::rcc::*;

    // 8 MHz crystal, 72 MHz core, 48 MHz USB
    let mut config = Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(8_000_000),
        mode: HseMode::Oscillator,
    });
    config.rcc.pll = Some(Pll {
        src: PllSource::HSE,
        prediv: PllPreDiv::DIV1,
        mul: PllMul::MUL9,
    });
    config.rcc.sys = Sysclk::PLL1_P;
    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV2;
    config.rcc.apb2_pre = APBPrescaler::DIV1;
    config
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Arcade I/O starting...");

    let mut p = embassy_stm32::init(clock_config());
    disable_jtag();

    let boot0 = Output::new(p.PD2, Level::Low, Speed::Low);

    // --- Mapping table ---
    let mode = output_mode();
    let flash = FlashStorage::new(Flash::new_blocking(p.FLASH));
    let mut store = ConfigStore::new(flash, CONFIG_REGION, mode.profile());
    let table = store.load_or_default();
    publish_active_config(&table);

    // --- Switches, harness order ---
    let pins: [Input<'static>; INPUT_COUNT] = [
        // Player 1
        Input::new(p.PC3, Pull::Up),
        Input::new(p.PA0, Pull::Up),
        Input::new(p.PA1, Pull::Up),
        Input::new(p.PC2, Pull::Up),
        Input::new(p.PC1, Pull::Up),
        Input::new(p.PC0, Pull::Up),
        Input::new(p.PC15, Pull::Up),
        Input::new(p.PC14, Pull::Up),
        Input::new(p.PC13, Pull::Up),
        Input::new(p.PB9, Pull::Up),
        Input::new(p.PB8, Pull::Up),
        Input::new(p.PB7, Pull::Up),
        Input::new(p.PB6, Pull::Up),
        Input::new(p.PB5, Pull::Up),
        Input::new(p.PB4, Pull::Up),
        Input::new(p.PB3, Pull::Up),
        Input::new(p.PA15, Pull::Up),
        // Player 2
        Input::new(p.PB0, Pull::Up),
        Input::new(p.PC7, Pull::Up),
        Input::new(p.PC6, Pull::Up),
        Input::new(p.PB1, Pull::Up),
        Input::new(p.PA7, Pull::Up),
        Input::new(p.PC4, Pull::Up),
        Input::new(p.PC5, Pull::Up),
        Input::new(p.PB2, Pull::Up),
        Input::new(p.PB10, Pull::Up),
        Input::new(p.PB11, Pull::Up),
        Input::new(p.PB12, Pull::Up),
        Input::new(p.PB13, Pull::Up),
        Input::new(p.PB14, Pull::Up),
        Input::new(p.PB15, Pull::Up),
        Input::new(p.PC8, Pull::Up),
        Input::new(p.PC9, Pull::Up),
        Input::new(p.PA6, Pull::Up),
    ];
    let bank = GpioBank::new(pins);

    let leds = Leds::new(
        Output::new(p.PC10, Level::Low, Speed::Low),
        Output::new(p.PC11, Level::Low, Speed::Low),
        Output::new(p.PC12, Level::Low, Speed::Low),
    );

    // --- USB Setup ---
    {
        // Pull D+ low so the host sees a fresh attach after a reset
        let _dp = Output::new(p.PA12.reborrow(), Level::Low, Speed::Low);
        Timer::after_millis(10).await;
    }
    let usb_driver = Driver::new(p.USB, Irqs, p.PA12, p.PA11);

    let mut usb_config = UsbConfig::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some(USB_MANUFACTURER);
    usb_config.product = Some(USB_PRODUCT);
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 640]),
    );
    builder.handler(VENDOR_HANDLER.init(VendorHandler));

    #[cfg(not(feature = "mode-jvs"))]
    let transport = {
        use arcade_io::usb_output::{configure_usb_hid, REPORT_SIZE};
        let hid_state = HID_STATE.init(embassy_usb::class::hid::State::new());
        arcade_io::HidTransport::new(configure_usb_hid::<REPORT_SIZE>(&mut builder, hid_state))
    };

    let usb_device = builder.build();

    // --- JVS Setup ---
    #[cfg(feature = "mode-jvs")]
    let (transport, sense) = {
        use arcade_io::board::JVS_BAUDRATE;
        use embassy_stm32::gpio::Flex;
        use embassy_stm32::usart::{Config as UartConfig, Uart};

        let mut uart_config = UartConfig::default();
        uart_config.baudrate = JVS_BAUDRATE;
        let uart = defmt::unwrap!(Uart::new(
            p.USART1,
            p.PA10, // RX
            p.PA9,  // TX
            Irqs,
            p.DMA1_CH4,
            p.DMA1_CH5,
            uart_config,
        ));
        let (tx, rx) = uart.split();
        let rx = rx.into_ring_buffered(JVS_RX_BUF.init([0; 256]));
        (
            arcade_io::JvsSerial::new(tx, rx),
            Some(SenseLine::new(Flex::new(p.PA2))),
        )
    };
    #[cfg(not(feature = "mode-jvs"))]
    let sense = None;

    let pipeline = Pipeline::new(bank, transport, INPUTS, table, mode);

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(reset_task(BoardReset::new(boot0)).unwrap());

    info!("Arcade I/O initialized");
    run(pipeline, store, leds, sense).await
}

/// Poll forever, applying host config changes between polls.
async fn run<T: Transport>(
    mut pipeline: Pipeline<GpioBank<Input<'static>, INPUT_COUNT>, T, INPUT_COUNT>,
    mut store: ConfigStore<FlashStorage<'static>>,
    mut leds: Leds,
    mut sense: Option<SenseLine>,
) -> ! {
    loop {
        if let Some(command) = CONFIG_COMMAND.try_take() {
            match command.apply_claimed(&mut store, &SAVE_GUARD) {
                Ok(table) => {
                    pipeline.apply_mapping(table);
                    publish_active_config(&table);
                }
                Err(e) => error!("config save failed: {}", e),
            }
        }

        let now = Instant::now().as_millis() as u32;
        if let Err(e) = pipeline.poll(now).await {
            error!("Output error: {:?}", e);
        }

        leds.show_activity(pipeline.actions());
        match pipeline.jvs() {
            Some(link) => {
                leds.set_status(link.io().device_id().is_some());
                if let Some(sense) = sense.as_mut() {
                    sense.set(link.io().sense_line());
                }
            }
            None => leds.heartbeat(Instant::now()),
        }

        embassy_futures::yield_now().await;
    }
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}
