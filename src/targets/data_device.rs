//! `meta-wayland-data-device.c`: the CLIPBOARD selection.

use crate::patch::RuleSpec;

pub const PATH: &str = "src/wayland/meta-wayland-data-device.c";

pub const SENTINELS: &[&str] = &[
    r"^static void\s+data_device_set_selection\s*\(",
    r"^static void\s+owner_changed_cb\s*\(",
    r"^void\s+meta_wayland_data_device_sync_focus\s*\(",
    r"meta_wayland_seat_get_input_focus_client\s*\(\s*seat\s*\)",
    r"&data_device->focus_resource_list",
];

pub const RULES: [RuleSpec; 2] = [
    RuleSpec {
        name: "remove-focus-check",
        summary: "data_device_set_selection(): removed focus check (any client can set the clipboard)",
        lines: (1064, 1070),
        // closing brace of the drag-and-drop actions check
        leading: "    }\n\n",
        original: concat!(
            "  if (wl_resource_get_client (resource) !=\n",
            "      meta_wayland_seat_get_input_focus_client (seat))\n",
            "    {\n",
            "      if (source)\n",
            "        meta_wayland_data_source_cancel (source);\n",
            "      return;\n",
            "    }\n",
            "\n",
        ),
        trailing: "  /* FIXME: Store serial",
        replacement: concat!(
            "  /* === VMWARE_CLIPBOARD_PATCH ===\n",
            "   * REMOVED: Focus check that blocked clipboard writes from unfocused apps.\n",
            "   * X11 never had this restriction. VMware, VirtualBox and clipboard\n",
            "   * managers all depend on background clipboard access.\n",
            "   * Original code (lines 1064-1070):\n",
            "   *   if (wl_resource_get_client (resource) !=\n",
            "   *       meta_wayland_seat_get_input_focus_client (seat))\n",
            "   *     { if (source) meta_wayland_data_source_cancel (source); return; }\n",
            "   * === /VMWARE_CLIPBOARD_PATCH === */\n",
            "\n",
        ),
    },
    RuleSpec {
        name: "notify-all-clients",
        summary: "owner_changed_cb() (clipboard): now notifies ALL clients (both resource lists)",
        lines: (1107, 1127),
        leading: "  MetaWaylandSeat *seat = compositor->seat;\n",
        original: concat!(
            "  struct wl_resource *data_device_resource;\n",
            "  struct wl_client *focus_client;\n",
            "\n",
            "  focus_client = meta_wayland_seat_get_input_focus_client (seat);\n",
            "  if (!focus_client)\n",
            "    return;\n",
            "\n",
            "  if (selection_type == META_SELECTION_CLIPBOARD)\n",
            "    {\n",
            "      wl_resource_for_each (data_device_resource,\n",
            "                            &data_device->focus_resource_list)\n",
            "        {\n",
            "          struct wl_resource *offer = NULL;\n",
            "\n",
            "          if (new_owner)\n",
            "            {\n",
            "              offer = create_and_send_clipboard_offer (data_device,\n",
            "                                                       data_device_resource);\n",
            "            }\n",
            "\n",
            "          wl_data_device_send_selection (data_device_resource, offer);\n",
            "        }\n",
            "    }\n",
            "}",
        ),
        trailing: "",
        replacement: concat!(
            "  struct wl_resource *data_device_resource;\n",
            "\n",
            "  /* === VMWARE_CLIPBOARD_PATCH ===\n",
            "   * REMOVED: Focus check that blocked clipboard notifications to unfocused apps.\n",
            "   * CHANGED: Now notify ALL clients, not just the focused one.\n",
            "   * Resources are split between resource_list (unfocused) and\n",
            "   * focus_resource_list (focused), so both lists are iterated.\n",
            "   * Original code (lines 1107-1127) only iterated focus_resource_list.\n",
            "   * === /VMWARE_CLIPBOARD_PATCH === */\n",
            "\n",
            "  if (selection_type == META_SELECTION_CLIPBOARD)\n",
            "    {\n",
            "      /* Notify unfocused clients (resource_list) */\n",
            "      wl_resource_for_each (data_device_resource,\n",
            "                            &data_device->resource_list)\n",
            "        {\n",
            "          struct wl_resource *offer = NULL;\n",
            "\n",
            "          if (new_owner)\n",
            "            {\n",
            "              offer = create_and_send_clipboard_offer (data_device,\n",
            "                                                       data_device_resource);\n",
            "            }\n",
            "\n",
            "          wl_data_device_send_selection (data_device_resource, offer);\n",
            "        }\n",
            "\n",
            "      /* Notify focused client (focus_resource_list) */\n",
            "      wl_resource_for_each (data_device_resource,\n",
            "                            &data_device->focus_resource_list)\n",
            "        {\n",
            "          struct wl_resource *offer = NULL;\n",
            "\n",
            "          if (new_owner)\n",
            "            {\n",
            "              offer = create_and_send_clipboard_offer (data_device,\n",
            "                                                       data_device_resource);\n",
            "            }\n",
            "\n",
            "          wl_data_device_send_selection (data_device_resource, offer);\n",
            "        }\n",
            "    }\n",
            "}",
        ),
    },
];
