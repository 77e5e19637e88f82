use crate::PaintApp;

pub fn central_panel(app: &mut PaintApp, ctx: &egui::Context) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let available_size = ui.available_size();
            let (response, painter) =
                ui.allocate_painter(available_size, egui::Sense::click_and_drag());
            let rect = response.rect;

            // Handle input
            let events = app.input_mut().process_response(&response);
            for event in events {
                app.session_mut().handle_input(event);
            }

            // Render the canvas
            let session = app.session();
            let history = session.history();
            app.renderer().render(&painter, rect, history.background(), history.active());

            // Tell the capture surface what is on screen and how large it is
            let pixels_per_point = ctx.pixels_per_point();
            let size = rect.size() * pixels_per_point;
            app.present([size.x.round() as u32, size.y.round() as u32], pixels_per_point);
        });
}
