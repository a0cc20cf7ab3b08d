#[derive(Clone)]
struct AppState {
    api: Arc<Mutex<GameApi>>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    fn new(api: GameApi, gateway: Arc<dyn MessageGateway>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(registry.clone(), gateway));
        Self {
            api: Arc::new(Mutex::new(api)),
            registry,
            dispatcher,
        }
    }
}
